//! Store handle abstraction
//!
//! A [`ContactStore`] is one live handle to the relational store. The
//! connection manager owns it; the repository borrows it per call.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Contact, NewContact};

/// Error reported by a store handle
#[derive(Error, Debug)]
pub enum StoreError {
    /// The handle can no longer talk to the store
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether this error means the handle is unusable and must be replaced.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::ConnectionLost(_) => true,
            Self::Sqlx(e) => is_connection_lost(e),
        }
    }
}

/// Classify a sqlx error as a connection-loss signal.
///
/// Covers transport failures, a closed pool, and Postgres SQLSTATE class 08
/// (connection exception) plus 57P01..57P03 (server shutting down or not
/// accepting connections).
///
/// `PoolTimedOut` is not included: a healthy pool under load raises it too.
/// The liveness check decides whether a timeout means the store is gone.
pub fn is_connection_lost(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| code.starts_with("08") || matches!(&*code, "57P01" | "57P02" | "57P03"))
            .unwrap_or(false),
        _ => false,
    }
}

/// Operations a live handle supports
#[async_trait]
pub trait ContactStore: Send + Sync + 'static {
    /// Cheap liveness check
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a contact stamped with the server's current time, returning its id.
    async fn insert_contact(&self, contact: &NewContact) -> Result<i64, StoreError>;

    /// All contacts, newest first.
    async fn list_contacts(&self) -> Result<Vec<Contact>, StoreError>;

    /// Run a DDL batch.
    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError>;

    /// Release the handle's resources. Called when the handle is discarded.
    async fn close(&self);
}
