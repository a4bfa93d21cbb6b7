//! Command implementations for the contactbox CLI

pub mod check;
pub mod schema;
pub mod serve;

pub use check::run_check_config;
pub use schema::run_schema;
pub use serve::run_serve;
