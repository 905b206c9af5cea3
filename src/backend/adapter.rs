//! Shared adapter machinery: engine lifecycle and simulation placeholders

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::backend::traits::{
    AdapterOutput, AdapterState, ArtifactKind, ArtifactSet, EngineFile, InferenceEngine,
};
use crate::config::SimulationConfig;
use crate::error::{AppError, Result};

/// Holds an optional engine and its one-shot capability probe result.
///
/// The probe runs at most once even when several requests hit an
/// uninitialized adapter at the same time.
pub struct EngineSlot {
    name: String,
    engine: Option<Arc<dyn InferenceEngine>>,
    state: OnceCell<AdapterState>,
}

impl EngineSlot {
    pub fn new(name: impl Into<String>, engine: Option<Arc<dyn InferenceEngine>>) -> Self {
        Self {
            name: name.into(),
            engine,
            state: OnceCell::new(),
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
            .get()
            .copied()
            .unwrap_or(AdapterState::Uninitialized)
    }

    /// Run the capability probe if it has not run yet
    pub async fn initialize(&self) -> AdapterState {
        *self
            .state
            .get_or_init(|| async {
                let Some(engine) = &self.engine else {
                    info!(backend = %self.name, "No engine configured, running in simulation mode");
                    return AdapterState::Unavailable;
                };

                match engine.probe().await {
                    Ok(()) => {
                        info!(backend = %self.name, model = %engine.model_id(), "Engine ready");
                        AdapterState::Ready
                    }
                    Err(e) => {
                        warn!(backend = %self.name, error = %e, "Engine probe failed, running in simulation mode");
                        AdapterState::Unavailable
                    }
                }
            })
            .await
    }

    /// The engine, if its probe succeeded
    pub async fn ready_engine(&self) -> Option<&Arc<dyn InferenceEngine>> {
        match self.initialize().await {
            AdapterState::Ready => self.engine.as_ref(),
            _ => None,
        }
    }

    /// Translate an engine error into a `BackendFailure` naming this backend
    pub fn engine_failure(&self, error: AppError) -> AppError {
        let detail = match error {
            AppError::BackendFailure(message) => message,
            other => other.to_string(),
        };
        AppError::BackendFailure(format!("{}: {}", self.name, detail))
    }
}

/// Placeholder artifacts served in simulation mode
#[derive(Debug, Clone)]
pub struct Placeholders {
    pub mesh_url: String,
    pub texture_url: String,
    pub thumbnail_url: String,
    pub format: String,
}

impl Placeholders {
    pub fn geometry(&self) -> AdapterOutput {
        let mut artifacts = ArtifactSet::new();
        artifacts.insert(ArtifactKind::Mesh, self.mesh_url.clone());
        artifacts.insert(ArtifactKind::Thumbnail, self.thumbnail_url.clone());
        AdapterOutput::Simulated {
            artifacts,
            format: self.format.clone(),
        }
    }

    pub fn texture(&self) -> AdapterOutput {
        let mut artifacts = ArtifactSet::new();
        artifacts.insert(ArtifactKind::Mesh, self.mesh_url.clone());
        artifacts.insert(ArtifactKind::Texture, self.texture_url.clone());
        artifacts.insert(ArtifactKind::Thumbnail, self.thumbnail_url.clone());
        AdapterOutput::Simulated {
            artifacts,
            format: self.format.clone(),
        }
    }
}

impl From<&SimulationConfig> for Placeholders {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            mesh_url: config.mesh_url.clone(),
            texture_url: config.texture_url.clone(),
            thumbnail_url: config.thumbnail_url.clone(),
            format: config.format.clone(),
        }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

/// Engine output must contain a mesh to be usable
pub fn require_mesh(backend: &str, files: Vec<EngineFile>) -> Result<AdapterOutput> {
    if !files.iter().any(|f| f.kind == ArtifactKind::Mesh && !f.data.is_empty()) {
        return Err(AppError::BackendFailure(format!(
            "{}: engine returned no mesh",
            backend
        )));
    }
    Ok(AdapterOutput::Generated(files))
}
