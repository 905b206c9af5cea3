//! Common traits and types for generation engines and their adapters

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// Opaque per-request options forwarded to the engine untouched
pub type Options = Map<String, Value>;

/// Geometry generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    #[serde(rename = "text-to-3d")]
    TextTo3d,
    #[serde(rename = "image-to-3d")]
    ImageTo3d,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextTo3d => "text-to-3d",
            Self::ImageTo3d => "image-to-3d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text-to-3d" => Some(Self::TextTo3d),
            "image-to-3d" => Some(Self::ImageTo3d),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geometry or lightweight generation request, before validation.
///
/// `image` holds the encoded (base64 or data URL) payload as received.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub prompt: Option<String>,
    pub image: Option<String>,
    pub backend: Option<String>,
    pub options: Options,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            mode: GenerationMode::TextTo3d,
            prompt: Some(prompt.into()),
            image: None,
            backend: None,
            options: Options::new(),
        }
    }

    pub fn image(image_base64: impl Into<String>) -> Self {
        Self {
            mode: GenerationMode::ImageTo3d,
            prompt: None,
            image: Some(image_base64.into()),
            backend: None,
            options: Options::new(),
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

/// A texture painting request, before validation
#[derive(Debug, Clone)]
pub struct TextureRequest {
    pub mesh: String,
    pub image: String,
    pub backend: Option<String>,
    pub options: Options,
}

/// Decoded input handed to an adapter
#[derive(Debug, Clone)]
pub enum Payload {
    Prompt(String),
    Image(Vec<u8>),
    Texture { mesh: Vec<u8>, image: Vec<u8> },
}

impl Payload {
    pub fn task_kind(&self) -> TaskKind {
        match self {
            Payload::Prompt(_) => TaskKind::TextTo3d,
            Payload::Image(_) => TaskKind::ImageTo3d,
            Payload::Texture { .. } => TaskKind::Texture,
        }
    }
}

/// What an engine is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    TextTo3d,
    ImageTo3d,
    Texture,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::TextTo3d => "text-to-3d",
            TaskKind::ImageTo3d => "image-to-3d",
            TaskKind::Texture => "texture",
        }
    }

    /// Task id prefix for geometry and texture requests
    pub fn task_prefix(&self) -> &'static str {
        match self {
            TaskKind::TextTo3d | TaskKind::ImageTo3d => "geom",
            TaskKind::Texture => "tex",
        }
    }
}

/// A single adapter invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub task_id: String,
    pub payload: Payload,
    pub options: Options,
}

/// Named output of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Mesh,
    Texture,
    Thumbnail,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Mesh => "mesh",
            ArtifactKind::Texture => "texture",
            ArtifactKind::Thumbnail => "thumbnail",
        }
    }
}

/// A file produced by an engine, not yet persisted
#[derive(Debug, Clone)]
pub struct EngineFile {
    pub kind: ArtifactKind,
    /// File extension, e.g. "glb" or "jpg"
    pub format: String,
    pub data: Vec<u8>,
}

/// Artifact URLs keyed by their role
pub type ArtifactSet = BTreeMap<ArtifactKind, String>;

/// What an adapter hands back to the gateway
#[derive(Debug, Clone)]
pub enum AdapterOutput {
    /// Real engine output that still has to be persisted
    Generated(Vec<EngineFile>),
    /// Placeholder artifacts served while the engine is unavailable
    Simulated { artifacts: ArtifactSet, format: String },
}

/// Family of adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    Geometry,
    Texture,
    Lightweight,
}

impl AdapterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "geometry" => Some(Self::Geometry),
            "texture" => Some(Self::Texture),
            "lightweight" => Some(Self::Lightweight),
            _ => None,
        }
    }
}

/// Lifecycle state of an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterState {
    Uninitialized,
    Ready,
    Unavailable,
}

/// Adapter status information
#[derive(Debug, Clone, Serialize)]
pub struct AdapterStatus {
    pub name: String,
    pub kind: AdapterKind,
    pub model_id: String,
    pub state: AdapterState,
    pub simulation: bool,
}

/// The external inference engine behind an adapter
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Model identifier served by this engine
    fn model_id(&self) -> &str;

    /// Check that the engine can serve requests
    async fn probe(&self) -> Result<()>;

    /// Run one inference
    async fn run(&self, invocation: &Invocation) -> Result<Vec<EngineFile>>;
}

/// Uniform invocation contract over every generation engine
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Get the adapter name
    fn name(&self) -> &str;

    fn kind(&self) -> AdapterKind;

    fn model_id(&self) -> &str;

    /// Current lifecycle state
    fn state(&self) -> AdapterState;

    /// Probe the engine once; later calls return the recorded state
    async fn initialize(&self) -> AdapterState;

    /// Whether this adapter can take the given kind of task
    fn accepts(&self, task: TaskKind) -> bool;

    /// Run one generation, or return placeholders when the engine is unavailable
    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterOutput>;

    /// Get current status
    fn status(&self) -> AdapterStatus {
        let state = self.state();
        AdapterStatus {
            name: self.name().to_string(),
            kind: self.kind(),
            model_id: self.model_id().to_string(),
            state,
            simulation: state == AdapterState::Unavailable,
        }
    }
}
