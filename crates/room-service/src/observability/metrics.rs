//! Metrics definitions for the room service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `room_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: parameterized paths, unknown paths collapse to `/other`
//! - `operation`: create, join, leave, plus store operation names
//! - `outcome`: success, noop, or an error kind
//!
//! Room and user ids are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Build the Prometheus recorder with SLO-aligned buckets.
///
/// Shared by [`init_metrics_recorder`] and tests that need a handle without
/// installing a global recorder.
pub fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("room_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )?
        .set_buckets_for_metric(
            Matcher::Prefix("room_membership_transition".to_string()),
            &[0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500],
        )?
        .set_buckets_for_metric(
            Matcher::Prefix("room_store_operation".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
}

/// Initialize the global Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    prometheus_builder()
        .map_err(|e| format!("Failed to set histogram buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `room_http_requests_total`, `room_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("room_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("room_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces room and user ids with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/v1/rooms" | "/api/v1/subjects" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    match parts.as_slice() {
        // /api/v1/rooms/{id}
        ["", "api", "v1", "rooms", _] => "/api/v1/rooms/{id}".to_string(),
        // /api/v1/rooms/{id}/{join|leave|participants}
        ["", "api", "v1", "rooms", _, action @ ("join" | "leave" | "participants")] => {
            format!("/api/v1/rooms/{{id}}/{action}")
        }
        // /api/v1/users/{id}/room-status
        ["", "api", "v1", "users", _, "room-status"] => {
            "/api/v1/users/{id}/room-status".to_string()
        }
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Membership Transition Metrics
// ============================================================================

/// Record a membership state transition.
///
/// Metric: `room_membership_transitions_total`,
/// `room_membership_transition_duration_seconds`
/// Labels: `operation` (create, join, leave), `outcome`
///
/// Duration includes time spent waiting on the per-user and per-room locks.
pub fn record_membership_transition(operation: &str, outcome: &str, duration: Duration) {
    histogram!("room_membership_transition_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("room_membership_transitions_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a room creation.
///
/// Metric: `room_rooms_created_total`
pub fn record_room_created() {
    counter!("room_rooms_created_total").increment(1);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record store operation latency.
///
/// Metric: `room_store_operation_duration_seconds`, `room_store_operations_total`
/// Labels: `operation`, `status`
pub fn record_store_operation(operation: &str, status: &str, duration: Duration) {
    histogram!("room_store_operation_duration_seconds",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("room_store_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
