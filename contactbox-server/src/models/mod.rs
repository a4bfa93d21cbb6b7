//! Domain models with validation at construction
//!
//! Submissions are validated when `NewContact` is built, so the repository
//! never sees an incomplete record.

pub mod contact;
pub mod validation;

pub use contact::{Contact, NewContact};
pub use validation::ValidationError;
