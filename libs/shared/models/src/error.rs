use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const GENERIC_CONNECTIVITY_MESSAGE: &str =
    "Could not reach the booking service. Check your connection and try again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("You need to be logged in to continue")]
    LoginRequired { login_url: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Redirect to login that brings the user back to `return_to` afterwards.
    pub fn login_required(login_path: &str, return_to: &str) -> Self {
        AppError::LoginRequired {
            login_url: format!("{}?from={}", login_path, urlencoding::encode(return_to)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, redirect) = match &self {
            AppError::LoginRequired { login_url } => {
                (StatusCode::UNAUTHORIZED, self.to_string(), Some(login_url.clone()))
            }
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), None),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, message);
        } else {
            tracing::debug!("Error: {}: {}", status, message);
        }

        let body = match redirect {
            Some(login_url) => Json(json!({
                "error": message,
                "redirect": login_url
            })),
            None => Json(json!({
                "error": message
            })),
        };

        (status, body).into_response()
    }
}
