//! Texture painting adapter (mesh + reference image to textured mesh)

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::backend::adapter::{require_mesh, EngineSlot, Placeholders};
use crate::backend::traits::{
    AdapterKind, AdapterOutput, AdapterState, BackendAdapter, InferenceEngine, Invocation,
    Payload, TaskKind,
};
use crate::error::{AppError, Result};

pub struct TextureAdapter {
    name: String,
    model_id: String,
    slot: EngineSlot,
    placeholders: Placeholders,
}

impl TextureAdapter {
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        engine: Option<Arc<dyn InferenceEngine>>,
        placeholders: Placeholders,
    ) -> Self {
        let name = name.into();
        Self {
            slot: EngineSlot::new(name.clone(), engine),
            name,
            model_id: model_id.into(),
            placeholders,
        }
    }
}

#[async_trait]
impl BackendAdapter for TextureAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Texture
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
        task == TaskKind::Texture
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterOutput> {
        match &invocation.payload {
            Payload::Texture { mesh, image } => {
                if mesh.is_empty() {
                    return Err(AppError::InvalidInput("mesh_file must not be empty".to_string()));
                }
                if image.is_empty() {
                    return Err(AppError::InvalidInput("image_base64 must not be empty".to_string()));
                }
            }
            _ => {
                return Err(AppError::InvalidInput(
                    "texture backends need a mesh and a reference image".to_string(),
                ))
            }
        }

        let Some(engine) = self.slot.ready_engine().await else {
            return Ok(self.placeholders.texture());
        };

        info!(backend = %self.name, task_id = %invocation.task_id, "Running texture synthesis");

        let files = engine
            .run(invocation)
            .await
            .map_err(|e| self.slot.engine_failure(e))?;

        require_mesh(&self.name, files)
    }
}
