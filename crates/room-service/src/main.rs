//! Room Service
//!
//! Entry point for the study room membership service.

use room_service::config::{Config, StoreBackend};
use room_service::observability::metrics::init_metrics_recorder;
use room_service::repositories::{InMemoryStore, PgStore, RoomStore, SubjectStore};
use room_service::routes::{self, AppState};
use room_service::services::{RoomMembershipService, SubjectCatalogService, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Room Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        store_backend = config.store_backend.as_str(),
        bind_address = %config.bind_address,
        request_timeout_seconds = config.request_timeout_seconds,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let (store, subject_store): (Arc<dyn RoomStore>, Arc<dyn SubjectStore>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                info!("Connecting to database...");
                let pg = Arc::new(PgStore::connect(&config).await.map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?);
                pg.run_migrations().await.map_err(|e| {
                    error!("Failed to run migrations: {}", e);
                    e
                })?;
                info!("Database connection established");

                let store: Arc<dyn RoomStore> = pg.clone();
                let subject_store: Arc<dyn SubjectStore> = pg;
                (store, subject_store)
            }
            StoreBackend::Memory => {
                warn!("Using in-process store; state is lost on restart");
                let memory = Arc::new(InMemoryStore::new());

                let store: Arc<dyn RoomStore> = memory.clone();
                let subject_store: Arc<dyn SubjectStore> = memory;
                (store, subject_store)
            }
        };

    let catalog = Arc::new(SubjectCatalogService::new(subject_store));
    if config.seed_default_subjects {
        catalog.seed_defaults().await.map_err(|e| {
            error!("Failed to seed subject catalog: {}", e);
            e
        })?;
    }

    let membership = Arc::new(RoomMembershipService::new(
        store.clone(),
        Arc::new(SystemClock),
    ));

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState {
        config,
        store,
        membership,
        catalog,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Room Service listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain_seconds))
        .await?;

    info!("Room Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
