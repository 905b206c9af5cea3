//! Backend registry: owns every adapter and its lifecycle

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::adapter::Placeholders;
use crate::backend::geometry::GeometryAdapter;
use crate::backend::http_engine::HttpEngine;
use crate::backend::lightweight::{LightweightAdapter, LightweightInput};
use crate::backend::texture::TextureAdapter;
use crate::backend::traits::{
    AdapterKind, AdapterState, AdapterStatus, BackendAdapter, InferenceEngine,
};
use crate::config::BackendConfig;
use crate::error::{AppError, Result};

/// Registry of named adapters
pub struct BackendRegistry {
    adapters: DashMap<String, Arc<dyn BackendAdapter>>,
    order: RwLock<Vec<String>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            adapters: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Build adapters for every configured backend and, if `eager`, probe them
    pub async fn initialize_from_config(
        &self,
        configs: &[BackendConfig],
        placeholders: &Placeholders,
        eager: bool,
    ) -> Result<()> {
        for config in configs {
            self.register(build_adapter(config, placeholders)?)?;
        }

        if eager {
            self.init().await;
        }

        Ok(())
    }

    /// Add an adapter under its own name
    pub fn register(&self, adapter: Arc<dyn BackendAdapter>) -> Result<()> {
        let name = adapter.name().to_string();
        if self.adapters.contains_key(&name) {
            return Err(AppError::Internal(format!("Backend '{}' registered twice", name)));
        }

        info!(backend = %name, kind = ?adapter.kind(), model = %adapter.model_id(), "Registered backend");
        self.adapters.insert(name.clone(), adapter);
        self.order.write().push(name);
        Ok(())
    }

    /// Probe every adapter that has not been probed yet.
    ///
    /// Probe failures never propagate: the adapter is recorded as unavailable.
    pub async fn init(&self) -> (usize, usize) {
        let states = join_all(self.get_all().into_iter().map(|adapter| async move {
            adapter.initialize().await
        }))
        .await;

        let ready = states.iter().filter(|s| **s == AdapterState::Ready).count();
        let unavailable = states.len() - ready;
        info!(ready, unavailable, "Backend registry initialized");
        (ready, unavailable)
    }

    /// Look up an adapter by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn BackendAdapter>> {
        self.adapters
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::BackendNotFound(name.to_string()))
    }

    /// All adapters in registration order
    pub fn get_all(&self) -> Vec<Arc<dyn BackendAdapter>> {
        self.order
            .read()
            .iter()
            .filter_map(|name| self.adapters.get(name).map(|e| e.value().clone()))
            .collect()
    }

    pub fn status(&self) -> Vec<AdapterStatus> {
        self.get_all().iter().map(|a| a.status()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Release every adapter and its engine handle
    pub fn shutdown(&self) {
        let count = self.adapters.len();
        self.order.write().clear();
        self.adapters.clear();
        info!(released = count, "Backend registry shut down");
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the adapter described by a backend configuration
pub fn build_adapter(
    config: &BackendConfig,
    placeholders: &Placeholders,
) -> Result<Arc<dyn BackendAdapter>> {
    let engine: Option<Arc<dyn InferenceEngine>> = if config.enabled && !config.endpoints.is_empty() {
        match HttpEngine::new(config) {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                warn!(backend = %config.name, error = %e, "Failed to create engine client");
                None
            }
        }
    } else {
        None
    };

    let kind = AdapterKind::parse(&config.kind).ok_or_else(|| {
        AppError::Config(config::ConfigError::Message(format!(
            "Backend '{}' has unknown kind '{}'",
            config.name, config.kind
        )))
    })?;

    let adapter: Arc<dyn BackendAdapter> = match kind {
        AdapterKind::Geometry => Arc::new(GeometryAdapter::new(
            &config.name,
            &config.model_id,
            engine,
            placeholders.clone(),
        )),
        AdapterKind::Texture => Arc::new(TextureAdapter::new(
            &config.name,
            &config.model_id,
            engine,
            placeholders.clone(),
        )),
        AdapterKind::Lightweight => {
            let input = config
                .input
                .as_deref()
                .and_then(LightweightInput::parse)
                .ok_or_else(|| {
                    AppError::Config(config::ConfigError::Message(format!(
                        "Lightweight backend '{}' needs input 'text' or 'image'",
                        config.name
                    )))
                })?;
            Arc::new(LightweightAdapter::new(
                &config.name,
                &config.model_id,
                input,
                engine,
                placeholders.clone(),
            ))
        }
    };

    Ok(adapter)
}
