//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Shutdown on SIGTERM/Ctrl+C or on a fatal store error

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::{ConnectionManager, ContactRepo};
use crate::supervisor::{FatalError, Outcome, Supervisor};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:4000)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub manager: ConnectionManager,
    pub contacts: ContactRepo,
}

impl AppState {
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            contacts: ContactRepo::new(manager.clone()),
            manager,
        }
    }
}

/// Dev-server origins allowed without `cors_permissive`
const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Build the application router with all routes
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(routes::health::router())
        .merge(routes::contacts::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server.
///
/// Starts the connection manager, serves until the supervisor reports a
/// shutdown signal or a fatal store error, then shuts the manager down.
///
/// # Example
///
/// ```ignore
/// let (supervisor, fatal) = Supervisor::new();
/// let manager = ConnectionManager::new(connector, config, ManagerOptions::default(), fatal);
/// run_server(manager, ServerConfig::default(), supervisor).await?;
/// ```
pub async fn run_server(
    manager: ConnectionManager,
    config: ServerConfig,
    supervisor: Supervisor,
) -> Result<(), ServerError> {
    manager.start().await;

    let app = build_router(AppState::new(manager.clone()), config.cors_permissive);

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    let (outcome_tx, outcome_rx) = oneshot::channel();
    let shutdown = async move {
        let outcome = supervisor.wait().await;
        let _ = outcome_tx.send(outcome);
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    manager.shutdown().await;

    match outcome_rx.await {
        Ok(Outcome::Fatal(err)) => Err(ServerError::Fatal(err)),
        _ => {
            tracing::info!("Server shutdown complete");
            Ok(())
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stopped after fatal store error: {0}")]
    Fatal(FatalError),
}
