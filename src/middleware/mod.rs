//! Middleware module - API key authentication and rate limiting

pub mod auth;
pub mod rate_limit;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};

use crate::error::{ErrorDetail, ErrorResponse};

/// Probe endpoints that stay reachable without a key and outside the rate limit
const PUBLIC_PATHS: &[&str] = &["/", "/health", "/models/status"];

pub(crate) fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

pub(crate) fn error_response(status: StatusCode, message: &str, error_type: &str, code: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            message: message.to_string(),
            r#type: error_type.to_string(),
            code: Some(code.to_string()),
        },
    };

    (status, Json(body)).into_response()
}
