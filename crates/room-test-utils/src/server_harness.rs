//! Test server harness for E2E testing
//!
//! Provides `TestRoomServer` for spawning real room service instances in
//! tests.

use metrics_exporter_prometheus::PrometheusBuilder;
use room_service::config::Config;
use room_service::repositories::{InMemoryStore, RoomStore, SubjectStore};
use room_service::routes::{self, AppState};
use room_service::services::{RoomMembershipService, SubjectCatalogService, SystemClock};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the room service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestRoomServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .get(&format!("{}/health", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRoomServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestRoomServer {
    /// Spawn a server backed by a fresh in-process store with the default
    /// subject catalog seeded.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_store(Arc::new(InMemoryStore::new()), "memory").await
    }

    /// Spawn a server over an existing store.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Seed the default subject catalog if it is empty
    /// - Start the HTTP server in the background
    ///
    /// `backend` is the `ROOM_STORE` value reported by `/health`.
    pub async fn spawn_with_store<S>(store: Arc<S>, backend: &str) -> Result<Self, anyhow::Error>
    where
        S: RoomStore + SubjectStore + 'static,
    {
        let vars = HashMap::from([
            ("ROOM_STORE".to_string(), backend.to_string()),
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let room_store: Arc<dyn RoomStore> = store.clone();
        let subject_store: Arc<dyn SubjectStore> = store;

        let catalog = Arc::new(SubjectCatalogService::new(subject_store));
        catalog
            .seed_defaults()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed subjects: {}", e))?;

        let state = Arc::new(AppState {
            config,
            store: room_store.clone(),
            membership: Arc::new(RoomMembershipService::new(
                room_store,
                Arc::new(SystemClock),
            )),
            catalog,
        });

        // A detached recorder: the global one can only be installed once per
        // process and tests spawn many servers.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state.clone(), metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the shared application state, e.g. to call the membership service
    /// directly.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestRoomServer {
    fn drop(&mut self) {
        // Abort the server task so the port is released when the test ends
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "memory");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_addr() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;
        let addr = server.addr();

        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
        assert_eq!(server.url(), format!("http://{}", addr));

        Ok(())
    }

    #[tokio::test]
    async fn test_server_state_shares_store() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;

        let subjects = server.state().catalog.list().await?;
        assert_eq!(subjects.len(), 10);

        Ok(())
    }
}
