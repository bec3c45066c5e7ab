//! Health and operational endpoint integration tests.
//!
//! Uses the `TestRoomServer` harness over the in-process store.

use room_test_utils::TestRoomServer;

/// Test that /health returns 200 with store status as JSON.
#[tokio::test]
async fn test_health_endpoint_returns_json() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    assert!(
        content_type.is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["store"], "healthy");

    Ok(())
}

/// Test that /metrics serves Prometheus text.
#[tokio::test]
async fn test_metrics_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/nonexistent", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

/// Test that the subject catalog is seeded and ordered by name.
#[tokio::test]
async fn test_subjects_endpoint_lists_defaults() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/subjects", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let subjects: Vec<serde_json::Value> = response.json().await?;
    assert_eq!(subjects.len(), 10);

    let names: Vec<&str> = subjects
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert!(names.contains(&"Computer Science"));

    Ok(())
}
