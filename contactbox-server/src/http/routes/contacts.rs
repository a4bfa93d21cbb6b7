//! Contact endpoints
//!
//! `/api/users` is the original submission path and stays an alias of
//! `/api/contact`.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::{Contact, NewContact, ValidationError};

/// Submission body. The message may arrive as `message` or `comments`.
#[derive(Debug, Default, Deserialize)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub comments: Option<String>,
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<NewContact, ValidationError> {
        NewContact::new(
            self.name.as_deref(),
            self.email.as_deref(),
            self.comments_text(),
        )
    }

    /// First non-blank of `message` and `comments`
    fn comments_text(&self) -> Option<&str> {
        [self.message.as_deref(), self.comments.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
    }
}

#[derive(Serialize)]
pub struct SavedResponse {
    pub success: bool,
    pub id: i64,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ContactsResponse {
    pub success: bool,
    pub users: Vec<Contact>,
}

/// POST /api/contact, POST /api/users
async fn create_contact(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<ContactSubmission>,
) -> Result<Json<SavedResponse>, ApiError> {
    let contact = body.validate()?;
    let id = state.contacts.insert(&contact).await?;

    Ok(Json(SavedResponse {
        success: true,
        id,
        message: "Contact saved successfully",
    }))
}

/// GET /api/users - every contact, newest first
async fn list_contacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ContactsResponse>, ApiError> {
    let users = state.contacts.list().await?;
    Ok(Json(ContactsResponse {
        success: true,
        users,
    }))
}

/// Contact routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contact", post(create_contact))
        .route("/api/users", get(list_contacts).post(create_contact))
}
