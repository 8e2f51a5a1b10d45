//! Hybrid Player Storage
//!
//! `SQLite` durable storage for player preferences.
//!
//! The player persists a handful of opaque values (loop mode, scheduler
//! state, the weekly schedule and the resume position) between sessions.
//! They live in a single key/value `preferences` table.
//!
//! # Example
//!
//! ```rust,no_run
//! use hybrid_core::PreferenceStore;
//! use hybrid_storage::{create_pool, run_migrations, SqlitePreferences};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://hybrid-player.db").await?;
//! run_migrations(&pool).await?;
//!
//! let prefs = SqlitePreferences::new(pool);
//! prefs.set("hybrid-player-loop-mode", "true").await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod preferences;

pub use error::{Result, StorageError};
pub use preferences::SqlitePreferences;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://hybrid-player.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!(database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    debug!("SQLite pool created");

    Ok(pool)
}
