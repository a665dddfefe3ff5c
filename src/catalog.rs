use std::path::Path;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod details;
pub mod search;
#[cfg(test)]
pub mod test_support;

/// Shared handle to the course catalog. The database is opened read-only;
/// nothing in this process ever writes to it.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Opens the catalog at `path`. `max_connections` should cover the
    /// number of concurrently served requests so no handler waits on a
    /// pool slot.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Catalog, sqlx::Error> {
        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Catalog { pool })
    }
}
