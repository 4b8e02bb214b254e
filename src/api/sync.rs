//! `POST /api/sync`: run one reconciliation pass.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::AppState;

/// Run the reconciler and return its summary.
///
/// Partial failures still answer 200 with a non-empty `errors` array. Only
/// an aborted run (warehouse unreachable) answers 500.
pub async fn run_sync(State(state): State<Arc<AppState>>) -> Response {
    match state.reconciler.reconcile().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            error!(%err, "sync aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "sync failed",
                    "details": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}
