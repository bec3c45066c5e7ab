//! Room service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Store failures are logged server-side and returned to clients as a
//! generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Name of the unique index that enforces one membership per user.
const MEMBERSHIP_USER_UNIQUE_INDEX: &str = "memberships_user_id_key";

/// Name of the check constraint that caps the participant count.
const PARTICIPANT_CAPACITY_CHECK: &str = "rooms_participant_count_capacity";

/// Name of the foreign key from memberships to rooms.
const MEMBERSHIP_ROOM_FOREIGN_KEY: &str = "memberships_room_id_fkey";

/// Room service error type.
///
/// Maps to HTTP status codes:
/// - Validation: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - Database: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RoomError {
    /// Malformed or out-of-range input, detected before any mutation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced room does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The transition would violate a membership or capacity invariant.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unexpected store failure. No partial state is applied.
    #[error("Database error: {0}")]
    Database(String),
}

impl RoomError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            RoomError::Validation(_) => 400,
            RoomError::NotFound(_) => 404,
            RoomError::Conflict(_) => 409,
            RoomError::Database(_) => 500,
        }
    }

    /// Bounded label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RoomError::Validation(_) => "validation",
            RoomError::NotFound(_) => "not_found",
            RoomError::Conflict(_) => "conflict",
            RoomError::Database(_) => "database",
        }
    }

    pub(crate) fn room_not_found() -> Self {
        RoomError::NotFound("Room not found".to_string())
    }

    pub(crate) fn already_in_another_room() -> Self {
        RoomError::Conflict("User is already in another room".to_string())
    }

    pub(crate) fn room_full() -> Self {
        RoomError::Conflict("Room is full".to_string())
    }

    pub(crate) fn not_in_room() -> Self {
        RoomError::Conflict("User is not in this room".to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RoomError::Validation(reason) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", reason.clone())
            }
            RoomError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            RoomError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            RoomError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "room.database", error = %err, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert sqlx errors to RoomError.
///
/// Constraint violations are the store's backstop for the membership and
/// capacity invariants and surface as conflicts.
impl From<sqlx::Error> for RoomError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                && db_err.constraint() == Some(MEMBERSHIP_USER_UNIQUE_INDEX)
            {
                return RoomError::already_in_another_room();
            }
            if db_err.is_check_violation() && db_err.constraint() == Some(PARTICIPANT_CAPACITY_CHECK)
            {
                return RoomError::room_full();
            }
            if db_err.is_foreign_key_violation()
                && db_err.constraint() == Some(MEMBERSHIP_ROOM_FOREIGN_KEY)
            {
                return RoomError::room_not_found();
            }
        }
        RoomError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_variants() {
        assert_eq!(
            RoomError::Validation("name is required".to_string()).to_string(),
            "Validation error: name is required"
        );
        assert_eq!(
            RoomError::room_not_found().to_string(),
            "Not found: Room not found"
        );
        assert_eq!(
            RoomError::room_full().to_string(),
            "Conflict: Room is full"
        );
        assert_eq!(
            RoomError::Database("connection reset".to_string()).to_string(),
            "Database error: connection reset"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RoomError::Validation("x".to_string()).status_code(), 400);
        assert_eq!(RoomError::room_not_found().status_code(), 404);
        assert_eq!(RoomError::not_in_room().status_code(), 409);
        assert_eq!(RoomError::Database("x".to_string()).status_code(), 500);
    }

    #[test]
    fn test_sqlx_row_not_found_is_database_error() {
        let err: RoomError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, RoomError::Database(_)));
    }

    #[tokio::test]
    async fn test_into_response_conflict() {
        let response = RoomError::already_in_another_room().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "CONFLICT");
        assert_eq!(
            body_json["error"]["message"],
            "User is already in another room"
        );
    }

    #[tokio::test]
    async fn test_into_response_validation() {
        let response =
            RoomError::Validation("Maximum participants must be at least 2".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_into_response_database_hides_details() {
        let response = RoomError::Database("password authentication failed".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal database error occurred"
        );
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = RoomError::room_not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Room not found");
    }
}
