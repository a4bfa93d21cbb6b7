//! contactbox-server: contact submissions over HTTP, persisted in Postgres
//!
//! The interesting part is the data-access layer: a connection manager that
//! keeps one live store handle, reconnects on loss at a fixed interval, and
//! escalates unrecognized store errors to a top-level supervisor.

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod supervisor;

pub use config::{ConfigError, ConfigSource, DatabaseConfig, EnvConfig};
pub use db::{ConnectionManager, ContactRepo, ManagerOptions, PgConnector};
pub use http::{run_server, ServerConfig, ServerError};
pub use supervisor::{FatalError, Supervisor};
