//! API key authentication middleware

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    collections::HashSet,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::middleware::{error_response, is_public_path};

/// Header accepted as an alternative to `Authorization`
const API_KEY_HEADER: &str = "x-api-key";

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    api_keys: Arc<HashSet<String>>,
}

impl AuthLayer {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys: Arc::new(api_keys.into_iter().filter(|k| !k.is_empty()).collect()),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            api_keys: self.api_keys.clone(),
        }
    }
}

/// Authentication middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    api_keys: Arc<HashSet<String>>,
}

/// Key from `Authorization: Bearer <key>`, a bare `Authorization` value, or `x-api-key`
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        let key = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        return Some(key.to_string());
    }

    headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|v| v.trim().to_string())
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if self.api_keys.is_empty() || is_public_path(request.uri().path()) {
            return Box::pin(self.inner.call(request));
        }

        match extract_api_key(request.headers()) {
            Some(key) if self.api_keys.contains(&key) => Box::pin(self.inner.call(request)),
            Some(_) => {
                warn!(path = %request.uri().path(), "Invalid API key provided");
                Box::pin(async move {
                    Ok(error_response(
                        StatusCode::UNAUTHORIZED,
                        "Invalid API key",
                        "authentication_error",
                        "invalid_api_key",
                    ))
                })
            }
            None => {
                warn!(path = %request.uri().path(), "No API key provided");
                Box::pin(async move {
                    Ok(error_response(
                        StatusCode::UNAUTHORIZED,
                        "API key required. Provide via Authorization header: 'Bearer YOUR_API_KEY'",
                        "authentication_error",
                        "missing_api_key",
                    ))
                })
            }
        }
    }
}
