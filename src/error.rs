//! Common error types for the generation gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Longest error text placed in a failed envelope
const MAX_PUBLIC_MESSAGE_CHARS: usize = 512;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend failure: {0}")]
    BackendFailure(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Overloaded: {0}")]
    Overloaded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors caused by the request itself rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::InvalidInput(_) | AppError::BackendNotFound(_))
    }

    /// Message safe to hand back to a caller inside a response envelope.
    ///
    /// Local I/O and internal failures can carry filesystem paths, so they are
    /// replaced by a generic text.
    pub fn public_message(&self) -> String {
        let message = match self {
            AppError::Io(_) => "failed to store generated artifacts".to_string(),
            AppError::Internal(_) | AppError::Config(_) => "internal server error".to_string(),
            AppError::HttpClient(_) => "inference engine request failed".to_string(),
            AppError::InvalidInput(m)
            | AppError::BackendFailure(m)
            | AppError::BackendUnavailable(m)
            | AppError::Timeout(m)
            | AppError::Overloaded(m) => m.clone(),
            other => other.to_string(),
        };

        if message.chars().count() > MAX_PUBLIC_MESSAGE_CHARS {
            message.chars().take(MAX_PUBLIC_MESSAGE_CHARS).collect()
        } else {
            message
        }
    }
}

/// Error response format for non-generation endpoints
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Json(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_json")),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "backend_error", None),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_input")),
            AppError::BackendNotFound(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("backend_not_found")),
            AppError::BackendUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "backend_error", Some("backend_unavailable")),
            AppError::BackendFailure(_) => (StatusCode::BAD_GATEWAY, "backend_error", Some("backend_failure")),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout_error", None),
            AppError::Overloaded(_) => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("overloaded")),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.public_message(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
