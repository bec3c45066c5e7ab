//! HTTP routes for the room service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::repositories::RoomStore;
use crate::services::{RoomMembershipService, SubjectCatalogService};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Store handle for health probes.
    pub store: Arc<dyn RoomStore>,

    /// Sole writer of room and membership state.
    pub membership: Arc<RoomMembershipService>,

    /// Subject catalog.
    pub catalog: Arc<SubjectCatalogService>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Store connectivity check - unversioned
/// - `/metrics` - Prometheus metrics endpoint - unversioned
/// - `/api/v1/subjects` - Subject catalog
/// - `/api/v1/rooms` - List and create rooms
/// - `/api/v1/rooms/{id}` - Get room
/// - `/api/v1/rooms/{id}/join`, `/api/v1/rooms/{id}/leave` - Membership
/// - `/api/v1/rooms/{id}/participants` - Participant list
/// - `/api/v1/users/{id}/room-status` - User's current room
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout from configuration
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/subjects", get(handlers::list_subjects))
        .route(
            "/api/v1/rooms",
            get(handlers::list_rooms).post(handlers::create_room),
        )
        .route("/api/v1/rooms/:id", get(handlers::get_room))
        .route("/api/v1/rooms/:id/join", post(handlers::join_room))
        .route("/api/v1/rooms/:id/leave", post(handlers::leave_room))
        .route(
            "/api/v1/rooms/:id/participants",
            get(handlers::list_participants),
        )
        .route(
            "/api/v1/users/:id/room-status",
            get(handlers::get_user_room_status),
        )
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
