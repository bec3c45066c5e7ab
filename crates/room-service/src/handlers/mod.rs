//! HTTP request handlers for the room service.

pub mod health;
pub mod metrics;
pub mod rooms;
pub mod subjects;
pub mod users;

pub use health::health_check;
pub use self::metrics::metrics_handler;
pub use rooms::{create_room, get_room, join_room, leave_room, list_participants, list_rooms};
pub use subjects::list_subjects;
pub use users::get_user_room_status;

use crate::errors::RoomError;
use axum::body::Bytes;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Deserialize a JSON request body.
///
/// Done by hand rather than with the `Json` extractor so malformed bodies
/// are 400, not Axum's default 422.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, RoomError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "room.handlers", error = %e, "Invalid request body");
        RoomError::Validation("Invalid request body".to_string())
    })
}

/// Parse a room id from the path.
///
/// A value that is not a UUID cannot name any room.
pub(crate) fn parse_room_id(raw: &str) -> Result<Uuid, RoomError> {
    Uuid::parse_str(raw).map_err(|_| RoomError::room_not_found())
}
