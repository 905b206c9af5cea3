//! Response handling module - result envelope, payload decoding and artifact storage

pub mod base64;
pub mod file;
pub mod url;

use serde::{Deserialize, Serialize};

use crate::backend::traits::{ArtifactKind, ArtifactSet};
use crate::error::AppError;

/// Terminal state of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
    Failed,
}

/// Which adapter served a request and whether it answered with placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendMode {
    pub backend: String,
    pub simulated: bool,
}

/// Outcome of one gateway request
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub task_id: String,
    pub status: GenerationStatus,
    pub artifacts: ArtifactSet,
    pub format: Option<String>,
    pub backend_mode: Option<BackendMode>,
    /// Set for lightweight models
    pub model_type: Option<String>,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn completed(
        task_id: String,
        artifacts: ArtifactSet,
        format: String,
        backend_mode: BackendMode,
    ) -> Self {
        Self {
            task_id,
            status: GenerationStatus::Completed,
            artifacts,
            format: Some(format),
            backend_mode: Some(backend_mode),
            model_type: None,
            error: None,
        }
    }

    pub fn failed(task_id: String, backend: Option<String>, error: &AppError) -> Self {
        Self {
            task_id,
            status: GenerationStatus::Failed,
            artifacts: ArtifactSet::new(),
            format: None,
            backend_mode: backend.map(|backend| BackendMode {
                backend,
                simulated: false,
            }),
            model_type: None,
            error: Some(error.public_message()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GenerationStatus::Completed
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&str> {
        self.artifacts.get(&kind).map(String::as_str)
    }
}

/// Result body inside a completed envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBody {
    pub mesh_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub format: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
}

/// Uniform response envelope of every generation endpoint.
///
/// Completed and failed generations are both sent with HTTP 200, so callers
/// must look at `success` rather than the status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub task_id: Option<String>,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResponse {
    /// Envelope for a request rejected before any task was dispatched
    pub fn rejected(error: &AppError) -> Self {
        Self {
            success: false,
            task_id: None,
            status: GenerationStatus::Failed,
            result: None,
            error: Some(error.public_message()),
        }
    }
}

impl From<GenerationResult> for GenerationResponse {
    fn from(result: GenerationResult) -> Self {
        let body = match (result.status, result.artifact(ArtifactKind::Mesh)) {
            (GenerationStatus::Completed, Some(mesh_url)) => Some(ResultBody {
                mesh_url: mesh_url.to_string(),
                texture_url: result.artifact(ArtifactKind::Texture).map(str::to_string),
                thumbnail_url: result.artifact(ArtifactKind::Thumbnail).map(str::to_string),
                format: result.format.clone().unwrap_or_else(|| "glb".to_string()),
                backend: result
                    .backend_mode
                    .as_ref()
                    .map(|m| m.backend.clone())
                    .unwrap_or_default(),
                mode: result
                    .backend_mode
                    .as_ref()
                    .filter(|m| m.simulated)
                    .map(|_| "simulation".to_string()),
                model_type: result.model_type.clone(),
            }),
            _ => None,
        };

        let success = result.is_completed() && body.is_some();
        Self {
            success,
            task_id: Some(result.task_id),
            status: if success {
                GenerationStatus::Completed
            } else {
                GenerationStatus::Failed
            },
            result: body,
            error: result
                .error
                .or_else(|| (!success).then(|| "generation produced no mesh".to_string())),
        }
    }
}
