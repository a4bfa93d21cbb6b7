//! Repository implementations for database access
//!
//! Repositories acquire a handle from the connection manager per call and
//! never retry a failed statement.

pub mod contacts;

pub use contacts::{ContactRepo, DatabaseError, DbErrorKind};
