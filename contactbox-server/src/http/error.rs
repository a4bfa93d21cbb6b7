//! API error types with IntoResponse
//!
//! Errors become `{success: false, message}` JSON bodies. Validation
//! failures are the caller's fault and are not logged as server faults.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::DatabaseError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Submission incomplete or unreadable (400)
    Validation(ValidationError),

    /// Store unavailable or statement failed (500, logged)
    Database(DatabaseError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(e) => {
                tracing::debug!(reason = %e, "rejected submission");
                (StatusCode::BAD_REQUEST, e.public_message())
            }
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!(operation = e.operation, error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
        };

        let body = json!({
            "success": false,
            "message": message
        });

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        Self::Database(e)
    }
}
