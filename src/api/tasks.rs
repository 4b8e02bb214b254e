//! Inbound task endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::inspection::{SamplingPlan, SubmissionOutcome};
use crate::models::inspection::SubmitInspection;
use crate::models::task::{CreateTask, InboundTask, TaskStatus};
use crate::persistence::task_repo::{TaskFilter, TaskRepo};
use crate::{AppError, Result};

use super::pagination::{Page, PageRequest};
use super::AppState;

/// Query parameters for `GET /api/tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    /// Exact status label.
    pub status: Option<String>,
    /// Free-text search over invoice, part, vendor, and lot.
    pub q: Option<String>,
    /// Only tasks still in the active queue.
    #[serde(default)]
    pub active: bool,
    /// Page number (1-indexed).
    pub page: Option<i64>,
    /// Rows per page.
    pub page_size: Option<i64>,
}

/// Body for `POST /api/tasks/{id}/start`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartRequest {
    /// Inspector taking the task.
    pub inspector: String,
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn repo(state: &AppState) -> TaskRepo {
    TaskRepo::new(Arc::clone(&state.db))
}

/// `GET /api/tasks`
///
/// # Errors
///
/// Returns `AppError::Validation` for an unknown status label.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Page<InboundTask>>> {
    let request = PageRequest::new(query.page, query.page_size);
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(TaskStatus::parse)
        .transpose()?;
    let filter = TaskFilter {
        status,
        active_only: query.active,
        search: query.q.map(|q| q.trim().to_owned()),
        offset: request.offset(),
        limit: request.page_size,
    };

    let (items, total) = repo(&state).list(&filter).await?;
    Ok(Json(Page::new(items, total, request)))
}

/// `POST /api/tasks`
///
/// Manually registered tasks start in `pending`.
///
/// # Errors
///
/// Returns `AppError::Validation` for a malformed body or missing
/// invoice/part, `AppError::Conflict` if an active task already holds the
/// same (invoice, part, vendor).
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CreateTask>, JsonRejection>,
) -> Result<(StatusCode, Json<InboundTask>)> {
    let input = body(payload)?.validate()?;
    let task = InboundTask::new(input, TaskStatus::Pending);
    let task = repo(&state).create(&task).await?;
    info!(task_id = %task.id, invoice = %task.invoice, part = %task.part, "task registered");
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /api/tasks/{id}`
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InboundTask>> {
    repo(&state)
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("task {id} not found")))
}

/// `DELETE /api/tasks/{id}`
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    repo(&state).delete(&id).await?;
    info!(task_id = %id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/tasks/{id}/start`
///
/// # Errors
///
/// Returns `AppError::InvalidTransition` unless the task is queued.
pub async fn start_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<InboundTask>> {
    let request = body(payload)?;
    let task = state.workflow.start(&id, &request.inspector).await?;
    Ok(Json(task))
}

/// `GET /api/tasks/{id}/sampling`
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn sampling_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SamplingPlan>> {
    Ok(Json(state.workflow.plan(&id).await?))
}

/// `POST /api/tasks/{id}/inspection`
///
/// # Errors
///
/// Returns `AppError::Validation` for a malformed body,
/// `AppError::InvalidTransition` for a closed task.
pub async fn submit_inspection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<SubmitInspection>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionOutcome>)> {
    let input = body(payload)?;
    let outcome = state.workflow.submit(&id, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
