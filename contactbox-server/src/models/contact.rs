//! Contact submissions
//!
//! Contacts are persisted in the `users` table; the table name predates the
//! contact form and is kept for compatibility with existing deployments.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::ValidationError;

/// A persisted contact submission. Append-only: never updated or deleted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated submission, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    name: String,
    email: String,
    comments: Option<String>,
}

impl NewContact {
    /// Validate a raw submission.
    ///
    /// `name` and `email` are trimmed and must be non-empty. Blank comments
    /// are normalized to `None` so they are stored as NULL.
    pub fn new(
        name: Option<&str>,
        email: Option<&str>,
        comments: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let name = required("name", name)?;
        let email = required("email", email)?;
        let comments = comments
            .filter(|c| !c.trim().is_empty())
            .map(str::to_owned);

        Ok(Self {
            name,
            email,
            comments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }
}

fn required(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_owned()),
        _ => Err(ValidationError::Empty { field }),
    }
}
