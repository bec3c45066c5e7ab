//! Subject catalog handler.

use crate::errors::RoomError;
use crate::models::Subject;
use crate::routes::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Handler for GET /api/v1/subjects
#[tracing::instrument(skip_all, name = "room.subjects.list")]
pub async fn list_subjects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Subject>>, RoomError> {
    let subjects = state.catalog.list().await?;
    Ok(Json(subjects))
}
