//! Route handlers
//!
//! - health: landing text and health check
//! - contacts: submission and listing

pub mod contacts;
pub mod health;
