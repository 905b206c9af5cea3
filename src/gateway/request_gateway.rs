//! Request gateway: validate, dispatch, and normalize every generation request

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::registry::BackendRegistry;
use crate::backend::traits::{
    AdapterKind, AdapterOutput, ArtifactKind, BackendAdapter, GenerationMode, GenerationRequest,
    Invocation, Options, Payload, TaskKind, TextureRequest,
};
use crate::config::{GatewayConfig, RoutingConfig};
use crate::error::{AppError, Result};
use crate::gateway::router::{BackendRouter, Surface};
use crate::queue::admission::{AdmissionConfig, AdmissionControl, AdmissionStats};
use crate::response::base64;
use crate::response::file::ArtifactStore;
use crate::response::{BackendMode, GenerationResult};

/// Limits applied by the gateway
#[derive(Debug, Clone)]
pub struct GatewayLimits {
    pub invoke_timeout: Duration,
    pub max_prompt_chars: usize,
    pub max_image_bytes: usize,
}

impl From<&GatewayConfig> for GatewayLimits {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            invoke_timeout: Duration::from_millis(config.invoke_timeout_ms),
            max_prompt_chars: config.max_prompt_chars,
            max_image_bytes: config.max_image_bytes,
        }
    }
}

/// Entry point for every generation request.
///
/// A request moves through `received -> validated -> dispatched` and ends in
/// `completed` or `failed`. Only client errors are returned as `Err`; every
/// other failure becomes a failed [`GenerationResult`].
pub struct RequestGateway {
    router: BackendRouter,
    store: Arc<ArtifactStore>,
    admission: AdmissionControl,
    limits: GatewayLimits,
}

/// Request that passed validation and has a task id and an adapter
struct Dispatch {
    task_id: String,
    adapter: Arc<dyn BackendAdapter>,
    options: Options,
}

impl RequestGateway {
    pub fn new(
        registry: Arc<BackendRegistry>,
        store: Arc<ArtifactStore>,
        config: &GatewayConfig,
        routing: &RoutingConfig,
    ) -> Self {
        Self {
            router: BackendRouter::with_config(registry, routing.clone()),
            store,
            admission: AdmissionControl::new(AdmissionConfig {
                max_concurrent: config.max_concurrent,
                max_pending: config.max_pending,
            }),
            limits: GatewayLimits::from(config),
        }
    }

    pub fn admission_stats(&self) -> AdmissionStats {
        self.admission.stats()
    }

    /// Geometry generation (`/generate/geometry`)
    pub async fn handle(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.handle_generation(Surface::Geometry, request).await
    }

    /// Lightweight model generation (`/generate/text-to-3d`, `/generate/image-to-3d`)
    pub async fn handle_lightweight(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.handle_generation(Surface::Lightweight, request).await
    }

    /// Texture painting (`/generate/texture`)
    pub async fn handle_texture(&self, request: TextureRequest) -> Result<GenerationResult> {
        debug!(task = TaskKind::Texture.as_str(), "Request received");
        validate_texture(&request).map_err(|e| {
            warn!(error = %e, "Rejected texture request");
            e
        })?;

        let dispatch = self.prepare(Surface::Texture, TaskKind::Texture, request.backend.as_deref(), request.options)?;

        let payload = base64::decode_payload("mesh_file", &request.mesh).and_then(|mesh| {
            let image = base64::decode_image("image_base64", &request.image, self.limits.max_image_bytes)?;
            Ok(Payload::Texture { mesh, image })
        });

        self.dispatch(dispatch, payload).await
    }

    async fn handle_generation(&self, surface: Surface, request: GenerationRequest) -> Result<GenerationResult> {
        debug!(mode = %request.mode, surface = ?surface, "Request received");
        validate_generation(&request, self.limits.max_prompt_chars).map_err(|e| {
            warn!(mode = %request.mode, error = %e, "Rejected generation request");
            e
        })?;

        let task = match request.mode {
            GenerationMode::TextTo3d => TaskKind::TextTo3d,
            GenerationMode::ImageTo3d => TaskKind::ImageTo3d,
        };

        let dispatch = self.prepare(surface, task, request.backend.as_deref(), request.options)?;

        let payload = match request.mode {
            GenerationMode::TextTo3d => Ok(Payload::Prompt(
                request.prompt.unwrap_or_default().trim().to_string(),
            )),
            GenerationMode::ImageTo3d => base64::decode_image(
                "image_base64",
                request.image.as_deref().unwrap_or_default(),
                self.limits.max_image_bytes,
            )
            .map(Payload::Image),
        };

        self.dispatch(dispatch, payload).await
    }

    /// Route the request and assign its task id
    fn prepare(
        &self,
        surface: Surface,
        task: TaskKind,
        backend: Option<&str>,
        options: Options,
    ) -> Result<Dispatch> {
        let adapter = self
            .router
            .route(surface, task, backend)
            .map_err(|e| {
                warn!(error = %e, "Rejected request, no matching backend");
                e
            })?;

        let task_id = new_task_id(surface.task_prefix(task));
        info!(task_id = %task_id, backend = %adapter.name(), task = task.as_str(), "Request validated");

        Ok(Dispatch {
            task_id,
            adapter,
            options,
        })
    }

    /// Run a validated request and normalize its outcome
    async fn dispatch(&self, dispatch: Dispatch, payload: Result<Payload>) -> Result<GenerationResult> {
        let Dispatch {
            task_id,
            adapter,
            options,
        } = dispatch;

        match self.run(&task_id, adapter.as_ref(), payload, options).await {
            Ok(result) => {
                info!(
                    task_id = %task_id,
                    backend = %adapter.name(),
                    simulated = result.backend_mode.as_ref().map(|m| m.simulated).unwrap_or(false),
                    "Request completed"
                );
                Ok(result)
            }
            Err(e) if e.is_client_error() => {
                warn!(task_id = %task_id, backend = %adapter.name(), error = %e, "Adapter rejected input");
                Err(e)
            }
            Err(e) => {
                error!(task_id = %task_id, backend = %adapter.name(), error = %e, "Request failed");
                Ok(GenerationResult::failed(task_id, Some(adapter.name().to_string()), &e))
            }
        }
    }

    async fn run(
        &self,
        task_id: &str,
        adapter: &dyn BackendAdapter,
        payload: Result<Payload>,
        options: Options,
    ) -> Result<GenerationResult> {
        let payload = payload?;
        let _permit = self.admission.acquire().await?;

        let invocation = Invocation {
            task_id: task_id.to_string(),
            payload,
            options,
        };

        info!(task_id = %task_id, backend = %adapter.name(), "Request dispatched");

        let output = tokio::time::timeout(self.limits.invoke_timeout, adapter.invoke(&invocation))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "{} did not finish within {} ms",
                    adapter.name(),
                    self.limits.invoke_timeout.as_millis()
                ))
            })??;

        let mut result = match output {
            AdapterOutput::Simulated { artifacts, format } => GenerationResult::completed(
                task_id.to_string(),
                artifacts,
                format,
                BackendMode {
                    backend: adapter.name().to_string(),
                    simulated: true,
                },
            ),
            AdapterOutput::Generated(files) => {
                let format = files
                    .iter()
                    .find(|f| f.kind == ArtifactKind::Mesh)
                    .map(|f| f.format.clone())
                    .unwrap_or_else(|| "glb".to_string());
                let artifacts = self.store.persist(task_id, &files).await?;
                GenerationResult::completed(
                    task_id.to_string(),
                    artifacts,
                    format,
                    BackendMode {
                        backend: adapter.name().to_string(),
                        simulated: false,
                    },
                )
            }
        };

        if adapter.kind() == AdapterKind::Lightweight {
            result.model_type = Some(adapter.name().to_string());
        }

        Ok(result)
    }
}

/// Collision-resistant task id: a prefix and a random UUID
pub fn new_task_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Check that exactly the field the mode needs is present
pub fn validate_generation(request: &GenerationRequest, max_prompt_chars: usize) -> Result<()> {
    match request.mode {
        GenerationMode::TextTo3d => {
            if !present(&request.prompt) {
                return Err(AppError::InvalidInput("text_prompt is required for text-to-3d".to_string()));
            }
            if present(&request.image) {
                return Err(AppError::InvalidInput(
                    "image_base64 must not be set for text-to-3d".to_string(),
                ));
            }
            let chars = request.prompt.as_deref().unwrap_or_default().trim().chars().count();
            if chars > max_prompt_chars {
                return Err(AppError::InvalidInput(format!(
                    "text_prompt must be at most {} characters",
                    max_prompt_chars
                )));
            }
        }
        GenerationMode::ImageTo3d => {
            if !present(&request.image) {
                return Err(AppError::InvalidInput("image_base64 is required for image-to-3d".to_string()));
            }
            if present(&request.prompt) {
                return Err(AppError::InvalidInput(
                    "text_prompt must not be set for image-to-3d".to_string(),
                ));
            }
        }
    }
    Ok(())
}

pub fn validate_texture(request: &TextureRequest) -> Result<()> {
    if request.mesh.trim().is_empty() {
        return Err(AppError::InvalidInput("mesh_file is required".to_string()));
    }
    if request.image.trim().is_empty() {
        return Err(AppError::InvalidInput("image_base64 is required".to_string()));
    }
    Ok(())
}
