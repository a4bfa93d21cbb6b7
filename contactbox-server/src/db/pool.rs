//! Postgres connection pool management
//!
//! Uses sqlx PgPool with explicit connection limits. Each pool is one
//! handle generation; the connection manager replaces it wholesale on loss.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use super::manager::Connector;
use super::store::{ContactStore, StoreError};
use crate::config::{DatabaseConfig, DatabaseTarget};
use crate::models::{Contact, NewContact};

/// Default maximum connections for the pool.
/// Kept low for a single small service.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a statement waits for a free pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens Postgres pools from a [`DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct PgConnector {
    max_connections: u32,
    acquire_timeout: Duration,
}

impl PgConnector {
    pub fn new(max_connections: u32) -> Self {
        Self {
            max_connections,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, config: &DatabaseConfig) -> Result<Arc<dyn ContactStore>, StoreError> {
        let options = connect_options(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(options)
            .await?;

        Ok(Arc::new(PgStore::new(pool)))
    }
}

/// Translate settings into sqlx connect options.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let options = match &config.target {
        DatabaseTarget::Url(url) => PgConnectOptions::from_str(url)?,
        DatabaseTarget::Params {
            host,
            port,
            user,
            password,
            database,
        } => PgConnectOptions::new()
            .host(host)
            .port(*port)
            .username(user)
            .password(password)
            .database(database),
    };

    // Cloud-hosted Postgres commonly presents certificates we cannot verify
    // locally, so TLS is required but not verified.
    Ok(if config.ssl {
        options.ssl_mode(PgSslMode::Require)
    } else {
        options
    })
}

/// A live Postgres handle backed by a pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn is_saturated(&self) -> bool {
        pool_saturated(
            self.pool.size(),
            self.pool.num_idle(),
            self.pool.options().get_max_connections(),
        )
    }
}

/// Every connection is open and checked out, so an acquire timeout says
/// nothing about the server.
fn pool_saturated(size: u32, idle: usize, max_connections: u32) -> bool {
    size >= max_connections && idle == 0
}

/// A liveness check that cannot get a connection while the pool has room to
/// open one means the server stopped accepting connections.
fn ping_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => {
            StoreError::ConnectionLost("no connection could be opened for the liveness check".into())
        }
        other => StoreError::Sqlx(other),
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::PoolTimedOut) if self.is_saturated() => {
                tracing::debug!(
                    size = self.pool.size(),
                    "liveness check skipped, every pooled connection is busy"
                );
                Ok(())
            }
            Err(err) => Err(ping_error(err)),
        }
    }

    async fn insert_contact(&self, contact: &NewContact) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (name, email, comments, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id
            "#,
        )
        .bind(contact.name())
        .bind(contact.email())
        .bind(contact.comments())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        // id breaks ties between rows stamped in the same transaction tick
        let contacts = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, name, email, comments, created_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
