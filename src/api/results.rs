//! Inspection history endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::models::inspection::{InspectionResult, Verdict};
use crate::persistence::result_repo::{ResultFilter, ResultRepo};
use crate::{AppError, Result};

use super::pagination::{Page, PageRequest};
use super::AppState;

/// Query parameters for `GET /api/results`.
#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    /// Restrict to one task.
    pub task_id: Option<String>,
    /// `PASS` or `FAIL`.
    pub judgment: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<i64>,
    /// Rows per page.
    pub page_size: Option<i64>,
}

/// `GET /api/results`
///
/// # Errors
///
/// Returns `AppError::Validation` for an unknown judgment.
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultQuery>,
) -> Result<Json<Page<InspectionResult>>> {
    let request = PageRequest::new(query.page, query.page_size);
    let judgment = query
        .judgment
        .as_deref()
        .filter(|j| !j.is_empty())
        .map(Verdict::parse)
        .transpose()?;
    let filter = ResultFilter {
        task_id: query.task_id.filter(|t| !t.is_empty()),
        judgment,
        offset: request.offset(),
        limit: request.page_size,
    };

    let (items, total) = ResultRepo::new(Arc::clone(&state.db)).list(&filter).await?;
    Ok(Json(Page::new(items, total, request)))
}

/// `GET /api/results/{id}`
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InspectionResult>> {
    ResultRepo::new(Arc::clone(&state.db))
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("result {id} not found")))
}
