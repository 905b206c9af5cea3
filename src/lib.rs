//! Mesh Generation Gateway
//!
//! Fronts several 3D generation backends (geometry, texture and lightweight
//! text/image-to-3D models) behind a single HTTP service. Backends whose
//! inference engine is unreachable fall back to simulation mode and return
//! placeholder artifacts.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod queue;
pub mod response;

pub use error::{AppError, Result};

use std::sync::Arc;
use tracing::info;

use backend::{adapter::Placeholders, registry::BackendRegistry};
use gateway::request_gateway::RequestGateway;
use response::file::ArtifactStore;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub backend_registry: Arc<BackendRegistry>,
    pub artifact_store: Arc<ArtifactStore>,
    pub gateway: Arc<RequestGateway>,
}

impl AppState {
    /// Register configured backends and wire the gateway on top of them
    pub async fn build(settings: config::Settings) -> Result<Arc<Self>> {
        let placeholders = Placeholders::from(&settings.simulation);

        let backend_registry = Arc::new(BackendRegistry::new());
        backend_registry
            .initialize_from_config(&settings.backends, &placeholders, settings.gateway.eager_init)
            .await?;

        let artifact_store = Arc::new(ArtifactStore::new(
            &settings.storage.base_path,
            settings.storage.url_prefix.clone(),
        ));
        artifact_store.ensure_storage_dir().await?;

        let gateway = Arc::new(RequestGateway::new(
            backend_registry.clone(),
            artifact_store.clone(),
            &settings.gateway,
            &settings.routing,
        ));

        info!(backends = backend_registry.len(), "Application state ready");

        Ok(Arc::new(Self {
            settings: Arc::new(settings),
            backend_registry,
            artifact_store,
            gateway,
        }))
    }
}
