//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with the local `SQLite` store.
    Db(String),
    /// Upstream warehouse source unreachable, timed out, or rejected a query.
    Upstream(String),
    /// Input failed schema or field validation.
    Validation(String),
    /// Write collided with an existing record (uniqueness constraint).
    Conflict(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Task lifecycle event is not allowed from the current status.
    InvalidTransition(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Short machine-readable kind label, used as the `error` field in
    /// HTTP error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Db(_) => "db",
            Self::Upstream(_) => "upstream",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Io(_) => "io",
        }
    }

    /// Inner message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Db(msg)
            | Self::Upstream(msg)
            | Self::Validation(msg)
            | Self::Conflict(msg)
            | Self::NotFound(msg)
            | Self::InvalidTransition(msg)
            | Self::Io(msg) => msg,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Upstream(msg) => write!(f, "upstream: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::InvalidTransition(msg) => write!(f, "invalid transition: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_owned());
            }
        }
        Self::Db(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
