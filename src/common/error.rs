// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Application error taxonomy. Every mutating entry point returns this
// rather than letting a failure escape to the HTTP layer untyped.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    // Unique-constraint violation surfaced as a typed conflict
    // (duplicate slug, duplicate email, ...).
    #[error("conflict on {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    // Rejected before any write (e.g. creating a license without
    // supplying both seats and expiry).
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or missing token")]
    InvalidToken,

    #[error("insufficient privileges")]
    Forbidden,

    #[error("database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Conflict(what) => {
                let body = Json(json!({ "error": "Conflict.", "on": what }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::NotFound(what) => {
                let body = Json(json!({ "error": format!("{what} not found.") }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::InvalidState(reason) => {
                let body = Json(json!({ "error": reason }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password."),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or missing bearer token."),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient privileges."),

            // Everything else (DatabaseError, InternalServerError, ...) is a 500.
            // The detailed message goes to the log, a generic one to the caller,
            // and the original operation has already been rolled back.
            ref e => {
                tracing::error!("internal server error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
