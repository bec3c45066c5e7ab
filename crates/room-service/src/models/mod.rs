//! Room service models.
//!
//! Contains the two owned entities (`Room`, `Membership`), the subject
//! catalog entry, and the typed request/response bodies of the API layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum capacity of a room.
pub const MIN_PARTICIPANTS: i32 = 2;

/// A capacity-bounded study session.
///
/// `participant_count` is a cache of the number of live memberships for the
/// room and is only ever written by the membership service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier, assigned at creation.
    pub id: Uuid,

    /// Room display name.
    pub name: String,

    /// Optional free-form description.
    pub description: Option<String>,

    /// Subject the room studies. Free-form, not checked against the catalog.
    pub subject: String,

    /// Capacity, at least `MIN_PARTICIPANTS`.
    pub max_participants: i32,

    /// Informational visibility flag.
    pub is_public: bool,

    /// User who created the room and was auto-joined.
    pub host_id: String,

    /// Number of live memberships, `0..=max_participants`.
    pub participant_count: i32,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Whether another participant can be admitted.
    pub fn has_capacity(&self) -> bool {
        self.participant_count < self.max_participants
    }
}

/// The record of one user's current occupancy of one room.
///
/// Fields are fixed from creation until the membership is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership identifier.
    pub id: Uuid,

    /// Joined user.
    pub user_id: String,

    /// Joined room.
    pub room_id: Uuid,

    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

/// Subject catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
}

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy" or "unhealthy").
    pub status: String,

    /// Store backend in use.
    pub backend: String,

    /// Store connectivity status.
    pub store: String,
}

// ============================================================================
// Room API Models
// ============================================================================

/// Request body for `POST /api/v1/rooms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    /// Room display name (required, trimmed).
    pub name: String,

    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,

    /// Subject (required).
    pub subject: String,

    /// Capacity (at least 2).
    pub max_participants: i32,

    /// Visibility flag.
    #[serde(default)]
    pub is_public: bool,

    /// Creating user, auto-joined as the first participant.
    pub host_id: String,
}

impl CreateRoomRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message naming the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("Name is required");
        }

        if self.subject.trim().is_empty() {
            return Err("Subject is required");
        }

        if self.max_participants < MIN_PARTICIPANTS {
            return Err("Maximum participants must be at least 2");
        }

        if self.host_id.trim().is_empty() {
            return Err("Host ID is required");
        }

        Ok(())
    }
}

/// Request body for join and leave.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipRequest {
    pub user_id: String,
}

/// Query string for `GET /api/v1/rooms`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRoomsQuery {
    /// Subject equality filter. Empty means unfiltered.
    pub subject: Option<String>,
}

/// Response for `POST /api/v1/rooms/{id}/join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room_id: Uuid,
    pub user_id: String,

    /// False when the user was already a member and nothing changed.
    pub joined: bool,
}

/// Response for `POST /api/v1/rooms/{id}/leave`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRoomResponse {
    pub room_id: Uuid,
    pub user_id: String,
}

/// Response for `GET /api/v1/rooms/{id}/participants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<Membership>,
    pub count: usize,
}

/// Whether a user currently occupies a room, and which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoomStatus {
    pub in_room: bool,

    /// Always serialized, `null` when the user is not in a room.
    pub room_id: Option<Uuid>,

    pub user_id: String,
}

impl UserRoomStatus {
    /// Build the status from the user's live membership, if any.
    pub fn from_membership(user_id: &str, membership: Option<&Membership>) -> Self {
        Self {
            in_room: membership.is_some(),
            room_id: membership.map(|m| m.room_id),
            user_id: user_id.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn valid_request() -> CreateRoomRequest {
        CreateRoomRequest {
            name: "Calculus II".to_string(),
            description: None,
            subject: "Mathematics".to_string(),
            max_participants: 5,
            is_public: true,
            host_id: "h1".to_string(),
        }
    }

    #[test]
    fn test_create_room_request_valid() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_create_room_request_blank_name() {
        let request = CreateRoomRequest {
            name: "   ".to_string(),
            ..valid_request()
        };
        assert_eq!(request.validate(), Err("Name is required"));
    }

    #[test]
    fn test_create_room_request_empty_subject() {
        let request = CreateRoomRequest {
            subject: String::new(),
            ..valid_request()
        };
        assert_eq!(request.validate(), Err("Subject is required"));
    }

    #[test]
    fn test_create_room_request_capacity_lower_bound() {
        let request = CreateRoomRequest {
            max_participants: 1,
            ..valid_request()
        };
        assert_eq!(
            request.validate(),
            Err("Maximum participants must be at least 2")
        );

        let request = CreateRoomRequest {
            max_participants: MIN_PARTICIPANTS,
            ..valid_request()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_room_request_missing_host() {
        let request = CreateRoomRequest {
            host_id: String::new(),
            ..valid_request()
        };
        assert_eq!(request.validate(), Err("Host ID is required"));
    }

    #[test]
    fn test_create_room_request_rejects_unknown_fields() {
        let body = r#"{
            "name": "Room",
            "subject": "Physics",
            "max_participants": 4,
            "host_id": "h1",
            "participant_count": 3
        }"#;
        let result: Result<CreateRoomRequest, _> = serde_json::from_str(body);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_room_request_optional_defaults() {
        let body = r#"{"name": "Room", "subject": "Physics", "max_participants": 4, "host_id": "h1"}"#;
        let request: CreateRoomRequest = serde_json::from_str(body).unwrap();
        assert!(request.description.is_none());
        assert!(!request.is_public);
    }

    #[test]
    fn test_user_room_status_serializes_null_room() {
        let status = UserRoomStatus::from_membership("u1", None);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["in_room"], false);
        assert!(json["room_id"].is_null());
        assert_eq!(json["user_id"], "u1");
    }

    #[test]
    fn test_user_room_status_from_membership() {
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            room_id: Uuid::new_v4(),
            joined_at: Utc::now(),
        };
        let status = UserRoomStatus::from_membership("u1", Some(&membership));

        assert!(status.in_room);
        assert_eq!(status.room_id, Some(membership.room_id));
    }

    #[test]
    fn test_room_has_capacity() {
        let mut room = Room {
            id: Uuid::new_v4(),
            name: "Room".to_string(),
            description: None,
            subject: "Art".to_string(),
            max_participants: 2,
            is_public: false,
            host_id: "h1".to_string(),
            participant_count: 1,
            created_at: Utc::now(),
        };
        assert!(room.has_capacity());

        room.participant_count = 2;
        assert!(!room.has_capacity());
    }
}
