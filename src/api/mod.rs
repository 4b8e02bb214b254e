//! REST API: router, shared state, and error mapping.

pub mod health;
pub mod pagination;
pub mod parts;
pub mod results;
pub mod sync;
pub mod tasks;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::GlobalConfig;
use crate::inspection::InspectionWorkflow;
use crate::persistence::db::Database;
use crate::sync::Reconciler;
use crate::warehouse::{PendingStatuses, WarehouseSource};
use crate::{AppError, Result};

/// State shared by every handler.
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// Local IQC store.
    pub db: Arc<Database>,
    /// Reconciliation engine.
    pub reconciler: Reconciler,
    /// Inspection state machine.
    pub workflow: InspectionWorkflow,
}

impl AppState {
    /// Wire the engines over the given store and warehouse capability.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        db: Arc<Database>,
        warehouse: Arc<dyn WarehouseSource>,
    ) -> Self {
        let timeout = config.fetch_timeout();
        let reconciler = Reconciler::new(
            Arc::clone(&db),
            Arc::clone(&warehouse),
            PendingStatuses::new(&config.warehouse.pending_statuses),
            timeout,
        );
        let workflow = InspectionWorkflow::new(
            Arc::clone(&db),
            warehouse,
            config.inspection.clone(),
            timeout,
        );
        Self {
            config,
            db,
            reconciler,
            workflow,
        }
    }
}

/// Build the application router.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/settings", get(health::settings))
        .route("/api/sync", post(sync::run_sync))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task).delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/start", post(tasks::start_task))
        .route("/api/tasks/{id}/sampling", get(tasks::sampling_plan))
        .route("/api/tasks/{id}/inspection", post(tasks::submit_inspection))
        .route("/api/results", get(results::list_results))
        .route("/api/results/{id}", get(results::get_result))
        .route("/api/parts", get(parts::list_parts))
        .with_state(state)
}

/// Serve the REST API until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the address is invalid or the listener
/// cannot bind, `AppError::Io` if the server fails while running.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind: SocketAddr = format!("{}:{}", state.config.bind_address, state.config.http_port)
        .parse()
        .map_err(|err| AppError::Config(format!("invalid bind address: {err}")))?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;
    info!(%bind, "starting REST API");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("HTTP server error: {err}")))?;

    info!("REST API shut down");
    Ok(())
}

/// Serve until `shutdown` resolves or the server stops on its own.
///
/// `ct` is cancelled before returning in both cases, so background tasks
/// sharing it wind down too.
///
/// # Errors
///
/// Returns the server's error when it stops first, for example when the
/// listener cannot bind.
pub async fn serve_until<F>(state: Arc<AppState>, ct: CancellationToken, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let server = serve(state, ct.clone());
    tokio::pin!(server);

    let stopped = tokio::select! {
        () = shutdown => None,
        served = &mut server => Some(served),
    };
    ct.cancel();

    match stopped {
        Some(served) => {
            if let Err(err) = &served {
                error!(%err, "REST API stopped before shutdown was requested");
            }
            served
        }
        None => {
            info!("shutdown requested");
            server.await
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Db(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(err = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "details": self.message(),
        }));
        (status, body).into_response()
    }
}
