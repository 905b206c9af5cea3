//! Router construction

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::api::handlers;
use crate::middleware::{auth::AuthLayer, rate_limit::RateLimitLayer};
use crate::AppState;

/// Build the HTTP router with all endpoints and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = state.settings.clone();

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/models/status", get(handlers::models_status))
        .route("/models/info", get(handlers::models_info))
        .route("/generate/geometry", post(handlers::generate_geometry))
        .route("/generate/texture", post(handlers::generate_texture))
        .route("/generate/text-to-3d", post(handlers::lightweight_text_to_3d))
        .route("/generate/image-to-3d", post(handlers::lightweight_image_to_3d))
        .nest_service("/files", ServeDir::new(&settings.storage.base_path))
        .with_state(state);

    if settings.rate_limit.enabled {
        info!(
            rps = settings.rate_limit.requests_per_second,
            burst = settings.rate_limit.burst_size,
            "Rate limiting enabled"
        );
        router = router.layer(RateLimitLayer::from(&settings.rate_limit));
    }

    if settings.auth.enabled {
        if settings.auth.api_keys.is_empty() {
            warn!("Authentication enabled without API keys, all requests are allowed");
        }
        router = router.layer(AuthLayer::new(settings.auth.api_keys.clone()));
    }

    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(DefaultBodyLimit::max(settings.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
