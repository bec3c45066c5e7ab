//! User handlers.

use crate::errors::RoomError;
use crate::models::UserRoomStatus;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/users/{id}/room-status
///
/// # Response
///
/// - 200 OK: `{in_room, room_id, user_id}`, `room_id` is null when the user
///   is not in a room
#[instrument(skip_all, name = "room.users.room_status")]
pub async fn get_user_room_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRoomStatus>, RoomError> {
    let status = state.membership.get_user_room_status(&user_id).await?;
    Ok(Json(status))
}
