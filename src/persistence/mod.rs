//! Persistence layer modules.

pub mod db;
pub mod part_repo;
pub mod result_repo;
pub mod schema;
pub mod task_repo;

use chrono::{DateTime, Utc};

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

use crate::{AppError, Result};

/// Parse an RFC 3339 column into UTC.
pub(crate) fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

/// Parse a nullable RFC 3339 column into UTC.
pub(crate) fn parse_optional_timestamp(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_timestamp(field, s)).transpose()
}
