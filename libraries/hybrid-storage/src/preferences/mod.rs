//! Player preference storage
//!
//! Values are stored verbatim as strings; callers own the encoding (the
//! player writes booleans as `"true"`/`"false"`, numbers in decimal and the
//! schedule as JSON).
//!
//! # Example
//!
//! ```rust,no_run
//! use hybrid_storage::preferences;
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! preferences::set_preference(pool, "hybrid-player-current-index", "3").await?;
//! let index = preferences::get_preference(pool, "hybrid-player-current-index").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use hybrid_core::PreferenceStore;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;

/// Stored preference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub key: String,
    pub value: String,
    /// Unix epoch seconds of the last write
    pub updated_at: i64,
}

/// Get a single preference value
///
/// # Returns
///
/// Returns `Ok(Some(value))` if the key exists, `Ok(None)` if not found
///
/// # Errors
///
/// Returns an error if the database query fails
pub async fn get_preference(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM preferences WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get::<String, _>("value")))
}

/// Insert or replace a preference value
///
/// # Errors
///
/// Returns an error if the database query fails
pub async fn set_preference(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO preferences (key, value, updated_at)
         VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(pool)
    .await?;

    debug!(key, "Preference stored");
    Ok(())
}

/// Get all stored preferences, ordered by key
///
/// # Errors
///
/// Returns an error if the database query fails
pub async fn get_all_preferences(pool: &SqlitePool) -> Result<Vec<Preference>> {
    let rows = sqlx::query("SELECT key, value, updated_at FROM preferences ORDER BY key")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Preference {
            key: row.get("key"),
            value: row.get("value"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

/// Delete a preference
///
/// # Returns
///
/// Returns `Ok(true)` if a value was deleted, `Ok(false)` if the key was absent
///
/// # Errors
///
/// Returns an error if the database query fails
pub async fn delete_preference(pool: &SqlitePool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM preferences WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// `PreferenceStore` over the `preferences` table
#[derive(Debug, Clone)]
pub struct SqlitePreferences {
    pool: SqlitePool,
}

impl SqlitePreferences {
    /// Wrap a pool; migrations must already have run
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferences {
    async fn get(&self, key: &str) -> hybrid_core::Result<Option<String>> {
        Ok(get_preference(&self.pool, key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> hybrid_core::Result<()> {
        Ok(set_preference(&self.pool, key, value).await?)
    }

    async fn remove(&self, key: &str) -> hybrid_core::Result<()> {
        delete_preference(&self.pool, key).await?;
        Ok(())
    }
}
