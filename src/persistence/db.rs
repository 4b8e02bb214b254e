//! `SQLite` connection pools and schema bootstrap.
//!
//! Pools are constructed once at startup and handed to every repository;
//! nothing in the crate reaches for a global connection.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{AppError, Result};

use super::schema;

/// Alias for the shared `SQLite` pool.
pub type Database = SqlitePool;

const MAX_CONNECTIONS: u32 = 5;

/// Open a file-backed pool without touching its schema.
///
/// Creates the parent directory and the database file when missing.
///
/// # Errors
///
/// Returns `AppError::Db` if the directory or connection cannot be created.
pub async fn open(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| AppError::Db(format!("failed to create db dir: {err}")))?;
    }

    let url = format!("sqlite://{}", path.to_string_lossy());
    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Open a private in-memory pool.
///
/// Limited to one connection: every `:memory:` connection is a separate
/// database.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection fails.
pub async fn open_memory() -> Result<Database> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Connect to the local IQC store at `path` and apply the schema.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema application fails.
pub async fn connect(path: &Path) -> Result<Database> {
    let pool = open(path).await?;
    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}

/// Connect to an in-memory IQC store with the schema applied.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema application fails.
pub async fn connect_memory() -> Result<Database> {
    let pool = open_memory().await?;
    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}
