//! Liveness and settings endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Effective inspection and sync settings.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// AQL applied to tasks without their own.
    pub default_aql: String,
    /// Whether legacy inverted result labels are in effect.
    pub invert_result_status: bool,
    /// Accepted "still pending" warehouse spellings.
    pub pending_statuses: Vec<String>,
    /// Periodic sync interval; 0 when disabled.
    pub sync_interval_seconds: u64,
}

/// `GET /api/settings`
pub async fn settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    let inspection = state.workflow.settings();
    Json(SettingsResponse {
        default_aql: inspection.default_aql.clone(),
        invert_result_status: inspection.invert_result_status,
        pending_statuses: state.config.warehouse.pending_statuses.clone(),
        sync_interval_seconds: state.config.sync.interval_seconds,
    })
}
