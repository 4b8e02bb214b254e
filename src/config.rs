//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Upstream warehouse connectivity and status vocabulary.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WarehouseConfig {
    /// Path to the warehouse `SQLite` database.
    pub db_path: PathBuf,
    /// Upper bound on any single upstream call.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Every spelling of "still pending" the warehouse may write.
    ///
    /// A `NULL` or empty status is always treated as pending in addition
    /// to these values.
    #[serde(default = "default_pending_statuses")]
    pub pending_statuses: Vec<String>,
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_pending_statuses() -> Vec<String> {
    vec![
        "Pending".into(),
        "pending".into(),
        "PENDING".into(),
        "待检".into(),
    ]
}

/// Inspection defaults applied when a task carries no explicit setting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InspectionConfig {
    /// AQL code used when the task has none.
    #[serde(default = "default_aql")]
    pub default_aql: String,
    /// Reproduce the legacy label wiring (PASS recorded as `Rejected`,
    /// FAIL recorded as `Passed`). Off unless product confirms otherwise.
    #[serde(default)]
    pub invert_result_status: bool,
}

fn default_aql() -> String {
    "1.0".into()
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            default_aql: default_aql(),
            invert_result_status: false,
        }
    }
}

/// Optional periodic reconciliation trigger.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    /// Seconds between automatic runs; 0 disables the trigger.
    #[serde(default)]
    pub interval_seconds: u64,
}

fn default_http_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path to the local IQC `SQLite` database.
    pub db_path: PathBuf,
    /// HTTP port for the REST API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Interface the REST API binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Upstream warehouse settings.
    pub warehouse: WarehouseConfig,
    /// Inspection defaults.
    #[serde(default)]
    pub inspection: InspectionConfig,
    /// Periodic sync settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Timeout wrapped around every upstream warehouse call.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.warehouse.fetch_timeout_seconds)
    }

    /// Interval for the periodic trigger, or `None` when disabled.
    #[must_use]
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync.interval_seconds > 0).then(|| Duration::from_secs(self.sync.interval_seconds))
    }

    fn validate(&self) -> Result<()> {
        if self.warehouse.fetch_timeout_seconds == 0 {
            return Err(AppError::Config(
                "warehouse.fetch_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self
            .warehouse
            .pending_statuses
            .iter()
            .all(|s| s.trim().is_empty())
        {
            return Err(AppError::Config(
                "warehouse.pending_statuses must not be empty".into(),
            ));
        }

        if self.inspection.default_aql.trim().is_empty() {
            return Err(AppError::Config(
                "inspection.default_aql must not be empty".into(),
            ));
        }

        Ok(())
    }
}
