//! Lightweight single-model adapters (Shap-E, DreamGaussian, Instant3D, Zero-1-to-3, PIFu)

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::backend::adapter::{require_mesh, EngineSlot, Placeholders};
use crate::backend::traits::{
    AdapterKind, AdapterOutput, AdapterState, BackendAdapter, InferenceEngine, Invocation,
    Payload, TaskKind,
};
use crate::error::{AppError, Result};

/// Input a lightweight model consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightweightInput {
    Text,
    Image,
}

impl LightweightInput {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    fn task(&self) -> TaskKind {
        match self {
            Self::Text => TaskKind::TextTo3d,
            Self::Image => TaskKind::ImageTo3d,
        }
    }
}

/// Descriptive catalog entry for a lightweight model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub vram_required: &'static str,
    pub generation_time: &'static str,
    pub quality: &'static str,
}

/// Catalog grouped by input type
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalog {
    pub text_to_3d_models: Vec<ModelInfo>,
    pub image_to_3d_models: Vec<ModelInfo>,
}

/// Known lightweight models
pub fn model_catalog() -> ModelCatalog {
    ModelCatalog {
        text_to_3d_models: vec![
            ModelInfo {
                name: "shap-e",
                description: "OpenAI lightweight implicit-function model",
                vram_required: "2-4GB",
                generation_time: "30s-2min",
                quality: "medium",
            },
            ModelInfo {
                name: "dreamgaussian",
                description: "Gaussian splatting based generation",
                vram_required: "3-6GB",
                generation_time: "1-3min",
                quality: "high",
            },
            ModelInfo {
                name: "instant3d",
                description: "Fast feed-forward generation",
                vram_required: "3-4GB",
                generation_time: "10-30s",
                quality: "medium",
            },
        ],
        image_to_3d_models: vec![
            ModelInfo {
                name: "zero123",
                description: "Single image novel-view synthesis",
                vram_required: "4-6GB",
                generation_time: "2-4min",
                quality: "high",
            },
            ModelInfo {
                name: "pifu",
                description: "Clothed human reconstruction",
                vram_required: "2-4GB",
                generation_time: "1-2min",
                quality: "medium",
            },
        ],
    }
}

pub struct LightweightAdapter {
    name: String,
    model_id: String,
    input: LightweightInput,
    slot: EngineSlot,
    placeholders: Placeholders,
}

impl LightweightAdapter {
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        input: LightweightInput,
        engine: Option<Arc<dyn InferenceEngine>>,
        placeholders: Placeholders,
    ) -> Self {
        let name = name.into();
        Self {
            slot: EngineSlot::new(name.clone(), engine),
            name,
            model_id: model_id.into(),
            input,
            placeholders,
        }
    }
}

#[async_trait]
impl BackendAdapter for LightweightAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Lightweight
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn state(&self) -> AdapterState {
        self.slot.state()
    }

    async fn initialize(&self) -> AdapterState {
        self.slot.initialize().await
    }

    fn accepts(&self, task: TaskKind) -> bool {
        task == self.input.task()
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterOutput> {
        match (&invocation.payload, self.input) {
            (Payload::Prompt(prompt), LightweightInput::Text) if !prompt.trim().is_empty() => {}
            (Payload::Image(image), LightweightInput::Image) if !image.is_empty() => {}
            (Payload::Prompt(_), LightweightInput::Text) => {
                return Err(AppError::InvalidInput("prompt must not be empty".to_string()))
            }
            (Payload::Image(_), LightweightInput::Image) => {
                return Err(AppError::InvalidInput("image must not be empty".to_string()))
            }
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "model '{}' only accepts {} input",
                    self.name,
                    match self.input {
                        LightweightInput::Text => "text",
                        LightweightInput::Image => "image",
                    }
                )))
            }
        }

        let Some(engine) = self.slot.ready_engine().await else {
            return Ok(self.placeholders.geometry());
        };

        info!(backend = %self.name, task_id = %invocation.task_id, "Running lightweight generation");

        let files = engine
            .run(invocation)
            .await
            .map_err(|e| self.slot.engine_failure(e))?;

        require_mesh(&self.name, files)
    }
}
