//! Validation error types

use std::fmt;

/// Validation error for inbound submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is missing or blank
    Empty { field: &'static str },

    /// Request body could not be read as a submission
    Malformed { reason: String },
}

impl ValidationError {
    /// Message shown to API callers.
    ///
    /// Every validation failure maps to the same user-facing text; the
    /// detailed `Display` form is kept for debug logs.
    pub fn public_message(&self) -> &'static str {
        "All fields are required"
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::Malformed { reason } => write!(f, "malformed submission: {}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}
