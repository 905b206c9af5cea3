//! Geometry diffusion adapter (prompt or image to mesh)

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::backend::adapter::{require_mesh, EngineSlot, Placeholders};
use crate::backend::traits::{
    AdapterKind, AdapterOutput, AdapterState, BackendAdapter, InferenceEngine, Invocation,
    Payload, TaskKind,
};
use crate::error::{AppError, Result};

pub struct GeometryAdapter {
    name: String,
    model_id: String,
    slot: EngineSlot,
    placeholders: Placeholders,
}

impl GeometryAdapter {
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

    fn validate(payload: &Payload) -> Result<()> {
        match payload {
            Payload::Prompt(prompt) if prompt.trim().is_empty() => Err(AppError::InvalidInput(
                "text_prompt must not be empty for text-to-3d".to_string(),
            )),
            Payload::Image(image) if image.is_empty() => Err(AppError::InvalidInput(
                "image must not be empty for image-to-3d".to_string(),
            )),
            Payload::Texture { .. } => Err(AppError::InvalidInput(
                "geometry backends do not accept texture requests".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BackendAdapter for GeometryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Geometry
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
        matches!(task, TaskKind::TextTo3d | TaskKind::ImageTo3d)
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterOutput> {
        Self::validate(&invocation.payload)?;

        let Some(engine) = self.slot.ready_engine().await else {
            return Ok(self.placeholders.geometry());
        };

        info!(
            backend = %self.name,
            task_id = %invocation.task_id,
            task = ?invocation.payload.task_kind(),
            "Running geometry generation"
        );

        let files = engine
            .run(invocation)
            .await
            .map_err(|e| self.slot.engine_failure(e))?;

        require_mesh(&self.name, files)
    }
}
