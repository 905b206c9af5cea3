//! HTTP request bodies for the generation endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::traits::{GenerationMode, GenerationRequest, Options, TextureRequest};
use crate::error::{AppError, Result};

/// `POST /generate/geometry`
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryBody {
    pub mode: String,
    #[serde(default)]
    pub text_prompt: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub options: Options,
}

impl GeometryBody {
    pub fn into_request(self) -> Result<GenerationRequest> {
        let mode = GenerationMode::parse(self.mode.trim()).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "unsupported mode '{}', expected 'text-to-3d' or 'image-to-3d'",
                self.mode
            ))
        })?;

        Ok(GenerationRequest {
            mode,
            prompt: self.text_prompt,
            image: self.image_base64,
            backend: self.backend,
            options: self.options,
        })
    }
}

/// `POST /generate/texture`
#[derive(Debug, Clone, Deserialize)]
pub struct TextureBody {
    #[serde(default)]
    pub mesh_file: String,
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub options: Options,
}

impl From<TextureBody> for TextureRequest {
    fn from(body: TextureBody) -> Self {
        Self {
            mesh: body.mesh_file,
            image: body.image_base64,
            backend: body.backend,
            options: body.options,
        }
    }
}

/// Quality tier for lightweight models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

/// Inference steps when the caller does not pass `num_steps`
const DEFAULT_NUM_STEPS: u32 = 20;

/// `POST /generate/text-to-3d`
#[derive(Debug, Clone, Deserialize)]
pub struct LightweightTextBody {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub num_steps: Option<u32>,
}

impl From<LightweightTextBody> for GenerationRequest {
    fn from(body: LightweightTextBody) -> Self {
        let steps = body.num_steps.unwrap_or(DEFAULT_NUM_STEPS);
        let mut options = Options::new();
        options.insert("quality".to_string(), serde_json::to_value(body.quality).unwrap_or(Value::Null));
        options.insert("num_steps".to_string(), Value::from(steps));

        Self {
            mode: GenerationMode::TextTo3d,
            prompt: Some(body.prompt),
            image: None,
            backend: body.model_type,
            options,
        }
    }
}

/// `POST /generate/image-to-3d`
#[derive(Debug, Clone, Deserialize)]
pub struct LightweightImageBody {
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub quality: Quality,
}

impl From<LightweightImageBody> for GenerationRequest {
    fn from(body: LightweightImageBody) -> Self {
        let mut options = Options::new();
        options.insert("quality".to_string(), serde_json::to_value(body.quality).unwrap_or(Value::Null));

        Self {
            mode: GenerationMode::ImageTo3d,
            prompt: None,
            image: Some(body.image_base64),
            backend: body.model_type,
            options,
        }
    }
}
