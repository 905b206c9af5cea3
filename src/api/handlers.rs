//! HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::models::{GeometryBody, LightweightImageBody, LightweightTextBody, TextureBody};
use crate::backend::lightweight::{model_catalog, ModelCatalog};
use crate::backend::traits::AdapterState;
use crate::error::{AppError, Result};
use crate::response::{GenerationResponse, GenerationResult};
use crate::AppState;

type EnvelopeReply = (StatusCode, Json<GenerationResponse>);

/// Map a gateway outcome to the response envelope.
///
/// Completed and failed generations are both HTTP 200; only requests
/// rejected as invalid get a 4xx.
fn envelope(outcome: Result<GenerationResult>) -> EnvelopeReply {
    match outcome {
        Ok(result) => (StatusCode::OK, Json(result.into())),
        Err(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, Json(GenerationResponse::rejected(&e))),
        Err(e) => (StatusCode::OK, Json(GenerationResponse::rejected(&e))),
    }
}

fn bad_json(rejection: JsonRejection) -> EnvelopeReply {
    envelope(Err(AppError::InvalidInput(rejection.body_text())))
}

pub async fn generate_geometry(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<GeometryBody>, JsonRejection>,
) -> EnvelopeReply {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_json(rejection),
    };

    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return envelope(Err(e)),
    };

    envelope(state.gateway.handle(request).await)
}

pub async fn generate_texture(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TextureBody>, JsonRejection>,
) -> EnvelopeReply {
    match body {
        Ok(Json(body)) => envelope(state.gateway.handle_texture(body.into()).await),
        Err(rejection) => bad_json(rejection),
    }
}

pub async fn lightweight_text_to_3d(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<LightweightTextBody>, JsonRejection>,
) -> EnvelopeReply {
    match body {
        Ok(Json(body)) => envelope(state.gateway.handle_lightweight(body.into()).await),
        Err(rejection) => bad_json(rejection),
    }
}

pub async fn lightweight_image_to_3d(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<LightweightImageBody>, JsonRejection>,
) -> EnvelopeReply {
    match body {
        Ok(Json(body)) => envelope(state.gateway.handle_lightweight(body.into()).await),
        Err(rejection) => bad_json(rejection),
    }
}

/// Service banner with per-backend readiness
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    let backends: serde_json::Map<String, Value> = state
        .backend_registry
        .status()
        .into_iter()
        .map(|s| (s.name, Value::Bool(s.state == AdapterState::Ready)))
        .collect();

    Json(json!({
        "message": "mesh generation gateway running",
        "version": env!("CARGO_PKG_VERSION"),
        "backends": backends,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn models_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let backends = state.backend_registry.status();
    let simulation = backends.iter().any(|b| b.simulation);

    Json(json!({
        "backends": backends,
        "simulation": simulation,
        "admission": state.gateway.admission_stats(),
    }))
}

pub async fn models_info() -> Json<ModelCatalog> {
    Json(model_catalog())
}
