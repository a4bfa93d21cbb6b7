//! Database layer - connection manager, store handles and repositories
//!
//! # Design Principles
//!
//! - One owned `ConnectionManager`, injected everywhere; no global handle
//! - Only the manager retries; a failed statement is reported immediately
//! - Handles are tagged with a generation so one loss means one reconnect

pub mod manager;
pub mod pool;
pub mod repos;
pub mod schema;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::{ConnectionError, ConnectionManager, ConnectionState, Connector, Handle, ManagerOptions};
pub use pool::{PgConnector, PgStore};
pub use repos::{ContactRepo, DatabaseError};
pub use store::{ContactStore, StoreError};
