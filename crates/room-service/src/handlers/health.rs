//! Health check handler.
//!
//! `/health` reports whether the store is reachable. Returns 503 when it is
//! not so load balancers stop routing to the instance.

use crate::models::HealthResponse;
use crate::repositories::RoomStore;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /health
#[tracing::instrument(skip_all, name = "room.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend = state.config.store_backend.as_str().to_string();

    if !state.store.ping().await {
        // Details are logged by the store; the response stays generic
        tracing::warn!(target: "room.handlers.health", backend = %backend, "Store ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                backend,
                store: "unhealthy".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            backend,
            store: "healthy".to_string(),
        }),
    )
}
