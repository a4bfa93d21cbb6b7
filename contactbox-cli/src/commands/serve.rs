//! HTTP server command
//!
//! Validates configuration, wires the connection manager and runs the
//! contact API until shutdown.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use contactbox_server::db::pool::DEFAULT_MAX_CONNECTIONS;
use contactbox_server::{
    run_server, ConfigSource, ConnectionManager, ContactRepo, EnvConfig, ManagerOptions,
    PgConnector, ServerConfig, Supervisor,
};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Interface to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Delay between database connection attempts, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,

    /// Seconds between connection liveness checks (0 disables)
    #[arg(long, default_value_t = 10)]
    pub liveness_interval_secs: u64,

    /// Maximum pooled connections per handle
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Create the users table if missing before serving
    #[arg(long)]
    pub init_schema: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = Arc::new(EnvConfig::new());

    // Missing settings are fatal here; later reloads only retry
    let db_config = config
        .load()
        .context("Database configuration is incomplete. Set DATABASE_URL or DB_HOST/DB_USER/DB_NAME")?;
    tracing::info!(database = %db_config.redacted(), tls = db_config.ssl, "database configured");

    let options = ManagerOptions {
        retry_delay: Duration::from_millis(args.retry_delay_ms),
        liveness_interval: (args.liveness_interval_secs > 0)
            .then(|| Duration::from_secs(args.liveness_interval_secs)),
    };

    let (supervisor, fatal) = Supervisor::new();
    let manager = ConnectionManager::new(
        Arc::new(PgConnector::new(args.max_connections)),
        config,
        options,
        fatal,
    );

    if args.init_schema {
        manager.start().await;
        manager
            .wait_ready()
            .await
            .context("Database never became ready")?;
        ContactRepo::new(manager.clone())
            .ensure_table()
            .await
            .context("Failed to create users table")?;
        tracing::info!("users table ready");
    }

    let server_config = ServerConfig {
        bind_addr: SocketAddr::new(args.host, args.port),
        cors_permissive: args.cors_permissive,
    };
    tracing::info!("Starting contactbox server on {}", server_config.bind_addr);

    // Run server (blocks until shutdown)
    run_server(manager, server_config, supervisor)
        .await
        .context("Server error")?;

    Ok(())
}
