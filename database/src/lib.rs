//! Persistence layer with SQLite
//!
//! Owns the entity records the core reads from and writes status, timestamp,
//! and result fields back to. The core itself never touches the pool.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

use fleetops_core::{Error, Result};

pub mod models;
pub mod queries;

pub use models::*;
pub use queries::*;

// Embed migrations at compile time
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Database connection pool
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect and run pending migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        info!(url = %database_url, "Connecting to database");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect: {}", e)))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| Error::Database(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. Single connection: each `:memory:`
    /// connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::Database(format!("Invalid database URL: {}", e)))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect: {}", e)))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| Error::Database(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
