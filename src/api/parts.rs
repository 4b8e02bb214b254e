//! `GET /api/parts`

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::models::part::Part;
use crate::persistence::part_repo::PartRepo;
use crate::Result;

use super::AppState;

/// List the part master.
///
/// # Errors
///
/// Returns `AppError::Db` if the query fails.
pub async fn list_parts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Part>>> {
    let parts = PartRepo::new(Arc::clone(&state.db)).list().await?;
    Ok(Json(parts))
}
