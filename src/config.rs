use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_DATABASE: &str = "reg.sqlite";
pub const DEFAULT_MAX_CLIENTS: usize = 64;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime settings handed to the listener at construction. Built from the
/// defaults above, an optional TOML limits file, and the command line, in
/// that order of precedence.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    /// Maximum connections served at once; later arrivals wait briefly for
    /// a slot and are then refused.
    pub max_clients: usize,
    /// Deadline for reading one request line.
    pub read_timeout: Duration,
    /// Deadline for writing one response line.
    pub write_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk shape of the limits file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    host: Option<String>,
    database: Option<PathBuf>,
    max_clients: Option<usize>,
    read_timeout_secs: Option<u64>,
    write_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_owned(),
            port: 0,
            database: PathBuf::from(DEFAULT_DATABASE),
            max_clients: DEFAULT_MAX_CLIENTS,
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Resolves the config from an optional limits file plus the port the
    /// caller was started with. A named file that cannot be read or parsed
    /// is a startup fault, never a silent fall-back to defaults.
    pub fn load(path: Option<&Path>, port: u16) -> Result<ServerConfig, ConfigError> {
        let file = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str::<ConfigFile>(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => ConfigFile::default(),
        };

        let defaults = ServerConfig::default();
        Ok(ServerConfig {
            host: file.host.unwrap_or(defaults.host),
            port,
            database: file.database.unwrap_or(defaults.database),
            max_clients: file.max_clients.unwrap_or(defaults.max_clients),
            read_timeout: file
                .read_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            write_timeout: file
                .write_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.write_timeout),
        })
    }
}
