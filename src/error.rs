//! Unified API error type
//!
//! Maps the service's error taxonomy onto HTTP status codes:
//! validation -> 400, not found -> 404, conflict/invalid transition -> 409,
//! database/io -> 500. External extractor/translator failures never surface
//! through this type on the trigger path; they are captured on the entity
//! as a terminal Failed status and read back through the status endpoints.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

/// Unified error type for registry, store, cache, and route operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown document, page, or translation key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write-once violation (e.g. re-writing a document's chunks)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rejected document status transition
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (upload persistence, file reads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = match &self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Io(_) => "IO_ERROR",
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
