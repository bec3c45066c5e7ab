//! Room handlers.
//!
//! Implements room endpoints:
//!
//! - `GET /api/v1/rooms` - List rooms, optional `?subject=` filter
//! - `POST /api/v1/rooms` - Create room, host auto-joins
//! - `GET /api/v1/rooms/{id}` - Get room
//! - `POST /api/v1/rooms/{id}/join` - Join room
//! - `POST /api/v1/rooms/{id}/leave` - Leave room
//! - `GET /api/v1/rooms/{id}/participants` - List participants
//!
//! The acting user is taken from the request body. Identity verification
//! happens in front of this service.

use crate::errors::RoomError;
use crate::handlers::{parse_json_body, parse_room_id};
use crate::models::{
    CreateRoomRequest, JoinRoomResponse, LeaveRoomResponse, ListRoomsQuery, MembershipRequest,
    ParticipantsResponse, Room,
};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/rooms
///
/// An empty `subject` lists every room.
#[instrument(skip_all, name = "room.rooms.list")]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRoomsQuery>,
) -> Result<Json<Vec<Room>>, RoomError> {
    let rooms = state.membership.list_rooms(query.subject.as_deref()).await?;
    Ok(Json(rooms))
}

/// Handler for POST /api/v1/rooms
///
/// # Response
///
/// - 201 Created: Room created with the host as its first participant
/// - 400 Bad Request: Malformed body or invalid field
/// - 409 Conflict: Host is already in another room
#[instrument(skip_all, name = "room.rooms.create")]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Room>), RoomError> {
    let request: CreateRoomRequest = parse_json_body(&body)?;
    let room = state.membership.create_room(request).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Handler for GET /api/v1/rooms/{id}
#[instrument(skip_all, name = "room.rooms.get", fields(room_id = %id))]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Room>, RoomError> {
    let room_id = parse_room_id(&id)?;
    let room = state.membership.get_room(room_id).await?;
    Ok(Json(room))
}

/// Handler for POST /api/v1/rooms/{id}/join
///
/// # Response
///
/// - 200 OK: `joined` is false when the user was already in the room
/// - 404 Not Found: Room does not exist
/// - 409 Conflict: User is in another room, or the room is full
#[instrument(skip_all, name = "room.rooms.join", fields(room_id = %id))]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<JoinRoomResponse>, RoomError> {
    let room_id = parse_room_id(&id)?;
    let request: MembershipRequest = parse_json_body(&body)?;

    let outcome = state
        .membership
        .join_room(room_id, &request.user_id)
        .await?;

    Ok(Json(JoinRoomResponse {
        room_id,
        user_id: request.user_id,
        joined: outcome.joined(),
    }))
}

/// Handler for POST /api/v1/rooms/{id}/leave
///
/// # Response
///
/// - 200 OK: Membership removed
/// - 409 Conflict: User is not in this room
#[instrument(skip_all, name = "room.rooms.leave", fields(room_id = %id))]
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<LeaveRoomResponse>, RoomError> {
    let request: MembershipRequest = parse_json_body(&body)?;
    // An unparseable id cannot be the user's room
    let room_id = parse_room_id(&id).map_err(|_| RoomError::not_in_room())?;

    state
        .membership
        .leave_room(room_id, &request.user_id)
        .await?;

    Ok(Json(LeaveRoomResponse {
        room_id,
        user_id: request.user_id,
    }))
}

/// Handler for GET /api/v1/rooms/{id}/participants
///
/// An unknown room has no participants.
#[instrument(skip_all, name = "room.rooms.participants", fields(room_id = %id))]
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ParticipantsResponse>, RoomError> {
    let Ok(room_id) = parse_room_id(&id) else {
        return Ok(Json(ParticipantsResponse {
            participants: Vec::new(),
            count: 0,
        }));
    };

    let participants = state.membership.list_participants(room_id).await?;
    let count = participants.len();
    Ok(Json(ParticipantsResponse {
        participants,
        count,
    }))
}
