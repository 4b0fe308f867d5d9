//! Server startup and shutdown.
//!
//! `run_server` builds the configured store, wraps it in the shared
//! application state, and serves the router until a shutdown signal arrives.

use crate::config::{Config, StoreBackend};
use crate::db::{MemoryStore, PgStore, UrlStore};
use crate::error::{AppError, AppResult};
use crate::routes;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Open the store selected by the configuration.
///
/// Migrations only apply to the PostgreSQL backend.
pub async fn open_store(config: &Config, should_migrate: bool) -> AppResult<Arc<dyn UrlStore>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let store = PgStore::connect(&config.database).await?;

            if should_migrate {
                info!("Running database migrations...");
                store.run_migrations().await?;
                info!("Migrations completed successfully");
            }

            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; links will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the web server with the given configuration.
///
/// # Errors
///
/// This function will return an error if:
/// - The store cannot be opened or migrated
/// - The router configuration is invalid
/// - Server binding fails
/// - Server runtime error occurs
pub async fn run_server(config: Config, addr: String, should_migrate: bool) -> AppResult<()> {
    info!("Starting shortkey server...");

    let store = open_store(&config, should_migrate).await?;
    let state = Arc::new(AppState::new(store, &config));

    let app = routes::create_router(state, &config.cors, &config.rate_limit)?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    info!("Server listening on {}", addr);
    info!("Base URL: {}", config.url.base_url);

    // Peer addresses feed the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(create_shutdown_signal())
    .await
    .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create a future that resolves when a shutdown signal is received.
///
/// On Unix-like systems, this listens for both Ctrl+C (SIGINT) and SIGTERM.
/// On other platforms, it only listens for Ctrl+C.
///
/// # Panics
///
/// Panics if signal handler installation fails: without it the process
/// could never shut down gracefully.
async fn create_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    info!("Shutdown signal received");
}
