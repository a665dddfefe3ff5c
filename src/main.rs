use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::ServerConfig;

mod catalog;
mod config;
mod error;
mod protocol;
mod server;

/// Line-oriented TCP query server for the course catalog.
#[derive(Parser, Debug)]
#[command(name = "registrar", about = "Course catalog query server")]
struct Args {
    /// Port to listen on
    port: u16,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Path to the read-only catalog database
    #[arg(long, env = "REG_DATABASE")]
    database: Option<PathBuf>,

    /// TOML file with server limits
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Begin logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let args = Args::parse();

    let mut config = match ServerConfig::load(args.config.as_deref(), args.port) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    // flags win over the limits file
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(database) = args.database {
        config.database = database;
    }

    if let Err(e) = server::run(config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
