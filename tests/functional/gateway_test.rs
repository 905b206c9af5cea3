//! Functional tests for the request gateway

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use mesh_gen_gateway::backend::adapter::Placeholders;
use mesh_gen_gateway::backend::geometry::GeometryAdapter;
use mesh_gen_gateway::backend::lightweight::{LightweightAdapter, LightweightInput};
use mesh_gen_gateway::backend::registry::BackendRegistry;
use mesh_gen_gateway::backend::texture::TextureAdapter;
use mesh_gen_gateway::backend::traits::{
    ArtifactKind, EngineFile, GenerationRequest, InferenceEngine, Invocation, Options,
    TextureRequest,
};
use mesh_gen_gateway::config::{GatewayConfig, RoutingConfig, Settings};
use mesh_gen_gateway::gateway::request_gateway::RequestGateway;
use mesh_gen_gateway::response::file::ArtifactStore;
use mesh_gen_gateway::response::{base64, GenerationResponse, GenerationStatus};
use mesh_gen_gateway::{AppError, Result};

const PNG_HEADER: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Hang,
}

struct FakeEngine {
    behavior: Behavior,
    runs: AtomicUsize,
}

impl FakeEngine {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            runs: AtomicUsize::new(0),
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    fn model_id(&self) -> &str {
        "fake/model"
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, _invocation: &Invocation) -> Result<Vec<EngineFile>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(vec![
                EngineFile {
                    kind: ArtifactKind::Mesh,
                    format: "glb".to_string(),
                    data: b"glTF-mesh".to_vec(),
                },
                EngineFile {
                    kind: ArtifactKind::Thumbnail,
                    format: "jpg".to_string(),
                    data: vec![0xFF, 0xD8, 0xFF, 0xE0],
                },
            ]),
            Behavior::Fail => Err(AppError::BackendFailure("CUDA out of memory".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(vec![])
            }
        }
    }
}

struct Harness {
    gateway: RequestGateway,
    engine: Arc<FakeEngine>,
    dir: TempDir,
}

impl Harness {
    fn stored_tasks(&self) -> usize {
        std::fs::read_dir(self.dir.path()).map(|d| d.count()).unwrap_or(0)
    }
}

async fn harness_with(behavior: Behavior, config: GatewayConfig) -> Harness {
    let engine = FakeEngine::new(behavior);
    let shared: Arc<dyn InferenceEngine> = engine.clone();
    let placeholders = Placeholders::default();

    let registry = Arc::new(BackendRegistry::new());
    registry
        .register(Arc::new(GeometryAdapter::new(
            "hunyuan-dit",
            "fake/geometry",
            Some(shared.clone()),
            placeholders.clone(),
        )))
        .unwrap();
    registry
        .register(Arc::new(TextureAdapter::new(
            "hunyuan-paint",
            "fake/texture",
            Some(shared.clone()),
            placeholders.clone(),
        )))
        .unwrap();
    registry
        .register(Arc::new(LightweightAdapter::new(
            "shap-e",
            "fake/shap-e",
            LightweightInput::Text,
            Some(shared.clone()),
            placeholders.clone(),
        )))
        .unwrap();
    registry
        .register(Arc::new(LightweightAdapter::new(
            "zero123",
            "fake/zero123",
            LightweightInput::Image,
            Some(shared),
            placeholders,
        )))
        .unwrap();
    registry.init().await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ArtifactStore::new(dir.path(), "/files"));

    Harness {
        gateway: RequestGateway::new(registry, store, &config, &RoutingConfig::default()),
        engine,
        dir,
    }
}

async fn harness(behavior: Behavior) -> Harness {
    harness_with(behavior, GatewayConfig::default()).await
}

/// Gateway over the default backends, none of which has an engine
async fn simulated_gateway() -> (RequestGateway, TempDir) {
    let registry = Arc::new(BackendRegistry::new());
    registry
        .initialize_from_config(&Settings::default().backends, &Placeholders::default(), true)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ArtifactStore::new(dir.path(), "/files"));
    (
        RequestGateway::new(registry, store, &GatewayConfig::default(), &RoutingConfig::default()),
        dir,
    )
}

fn texture_request(mesh: &str) -> TextureRequest {
    TextureRequest {
        mesh: mesh.to_string(),
        image: base64::encode(&PNG_HEADER),
        backend: None,
        options: Options::new(),
    }
}

#[tokio::test]
async fn test_simulated_text_to_3d() {
    let (gateway, _dir) = simulated_gateway().await;

    let result = gateway
        .handle(GenerationRequest::text("a small cat"))
        .await
        .unwrap();

    assert_eq!(result.status, GenerationStatus::Completed);
    assert!(result.task_id.starts_with("geom_"));
    assert_eq!(result.artifact(ArtifactKind::Mesh), Some("/api/demo-model.glb"));

    let response = GenerationResponse::from(result);
    assert!(response.success);
    let body = response.result.unwrap();
    assert_eq!(body.format, "glb");
    assert_eq!(body.backend, "hunyuan-dit");
    assert_eq!(body.mode.as_deref(), Some("simulation"));
    assert_eq!(body.thumbnail_url.as_deref(), Some("/placeholder.jpg"));
}

#[tokio::test]
async fn test_simulated_texture_has_texture_url() {
    let (gateway, _dir) = simulated_gateway().await;

    let result = gateway
        .handle_texture(texture_request(&base64::encode(b"mesh-bytes")))
        .await
        .unwrap();

    assert!(result.task_id.starts_with("tex_"));
    assert_eq!(result.artifact(ArtifactKind::Texture), Some("/api/demo-texture.jpg"));
}

#[tokio::test]
async fn test_empty_image_is_invalid_input() {
    let h = harness(Behavior::Succeed).await;

    let err = h.gateway.handle(GenerationRequest::image("")).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(h.engine.runs(), 0);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_engine() {
    let h = harness(Behavior::Succeed).await;

    let mut both = GenerationRequest::text("a small cat");
    both.image = Some(base64::encode(&PNG_HEADER));
    assert!(h.gateway.handle(both).await.is_err());

    let too_long = GenerationRequest::text("x".repeat(1001));
    assert!(h.gateway.handle(too_long).await.is_err());

    let unknown = GenerationRequest::text("a small cat").with_backend("does-not-exist");
    assert!(matches!(
        h.gateway.handle(unknown).await,
        Err(AppError::InvalidInput(_))
    ));

    let wrong_kind = GenerationRequest::text("a small cat").with_backend("hunyuan-paint");
    assert!(matches!(
        h.gateway.handle(wrong_kind).await,
        Err(AppError::InvalidInput(_))
    ));

    assert_eq!(h.engine.runs(), 0);
    assert_eq!(h.stored_tasks(), 0);
}

#[tokio::test]
async fn test_malformed_mesh_fails_without_files() {
    let h = harness(Behavior::Succeed).await;

    let result = h
        .gateway
        .handle_texture(texture_request("@@@ not base64 @@@"))
        .await
        .unwrap();

    assert_eq!(result.status, GenerationStatus::Failed);
    assert!(result.task_id.starts_with("tex_"));
    assert!(result.error.as_deref().unwrap().contains("mesh_file"));
    assert_eq!(h.engine.runs(), 0);
    assert_eq!(h.stored_tasks(), 0);
}

#[tokio::test]
async fn test_engine_failure_becomes_failed_result() {
    let h = harness(Behavior::Fail).await;

    let result = h
        .gateway
        .handle(GenerationRequest::text("a small cat"))
        .await
        .unwrap();

    assert_eq!(result.status, GenerationStatus::Failed);
    let error = result.error.clone().unwrap();
    assert!(!error.is_empty());
    assert!(error.contains("CUDA out of memory"));

    let response = GenerationResponse::from(result);
    assert!(!response.success);
    assert!(response.task_id.is_some());
    assert!(response.result.is_none());
    assert_eq!(h.stored_tasks(), 0);
}

#[tokio::test]
async fn test_generated_artifacts_are_persisted() {
    let h = harness(Behavior::Succeed).await;

    let result = h
        .gateway
        .handle(GenerationRequest::image(base64::encode(&PNG_HEADER)))
        .await
        .unwrap();

    assert!(result.is_completed());
    assert_eq!(result.format.as_deref(), Some("glb"));
    assert_eq!(
        result.artifact(ArtifactKind::Mesh).unwrap(),
        format!("/files/{}/mesh.glb", result.task_id)
    );

    let mesh = h.dir.path().join(&result.task_id).join("mesh.glb");
    assert_eq!(std::fs::read(mesh).unwrap(), b"glTF-mesh");
    assert!(h.dir.path().join(&result.task_id).join("thumbnail.jpg").exists());

    let response = GenerationResponse::from(result);
    assert!(response.result.unwrap().mode.is_none());
}

#[tokio::test]
async fn test_invoke_timeout() {
    let config = GatewayConfig {
        invoke_timeout_ms: 50,
        ..GatewayConfig::default()
    };
    let h = harness_with(Behavior::Hang, config).await;

    let result = h
        .gateway
        .handle(GenerationRequest::text("a small cat"))
        .await
        .unwrap();

    assert_eq!(result.status, GenerationStatus::Failed);
    assert!(result.error.unwrap().contains("did not finish"));
}

#[tokio::test]
async fn test_concurrent_requests_get_unique_task_ids() {
    let (gateway, _dir) = simulated_gateway().await;

    let results = join_all((0..8).map(|_| gateway.handle(GenerationRequest::text("a small cat")))).await;

    let ids: HashSet<String> = results
        .into_iter()
        .map(|r| {
            let r = r.unwrap();
            assert!(r.is_completed());
            r.task_id
        })
        .collect();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_full_queue_fails_request() {
    let config = GatewayConfig {
        invoke_timeout_ms: 300,
        max_concurrent: 1,
        max_pending: 0,
        ..GatewayConfig::default()
    };
    let h = Arc::new(harness_with(Behavior::Hang, config).await);

    let busy = {
        let h = h.clone();
        tokio::spawn(async move { h.gateway.handle(GenerationRequest::text("first")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let rejected = h
        .gateway
        .handle(GenerationRequest::text("second"))
        .await
        .unwrap();
    assert_eq!(rejected.status, GenerationStatus::Failed);
    assert!(rejected.error.unwrap().contains("queue is full"));
    assert_eq!(h.gateway.admission_stats().rejected, 1);

    let first = busy.await.unwrap().unwrap();
    assert_eq!(first.status, GenerationStatus::Failed);
}

#[tokio::test]
async fn test_lightweight_reports_model_type() {
    let h = harness(Behavior::Succeed).await;

    let result = h
        .gateway
        .handle_lightweight(GenerationRequest::text("a wooden chair").with_backend("shap-e"))
        .await
        .unwrap();

    assert!(result.task_id.starts_with("text3d_"));
    assert_eq!(result.model_type.as_deref(), Some("shap-e"));

    let image = h
        .gateway
        .handle_lightweight(GenerationRequest::image(base64::encode(&PNG_HEADER)).with_backend("zero123"))
        .await
        .unwrap();
    assert!(image.task_id.starts_with("img3d_"));

    let mismatch = h
        .gateway
        .handle_lightweight(GenerationRequest::text("a wooden chair").with_backend("zero123"))
        .await;
    assert!(matches!(mismatch, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_routing_follows_configured_backend_names() {
    let engine = FakeEngine::new(Behavior::Succeed);
    let shared: Arc<dyn InferenceEngine> = engine.clone();

    let registry = Arc::new(BackendRegistry::new());
    registry
        .register(Arc::new(GeometryAdapter::new(
            "my-geometry",
            "fake/geometry",
            Some(shared.clone()),
            Placeholders::default(),
        )))
        .unwrap();
    registry
        .register(Arc::new(LightweightAdapter::new(
            "my-text",
            "fake/text",
            LightweightInput::Text,
            Some(shared),
            Placeholders::default(),
        )))
        .unwrap();
    registry.init().await;

    let routing = RoutingConfig {
        geometry_default: "my-geometry".to_string(),
        lightweight_text_default: "my-text".to_string(),
        ..RoutingConfig::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ArtifactStore::new(dir.path(), "/files"));
    let gateway = RequestGateway::new(registry, store, &GatewayConfig::default(), &routing);

    let result = gateway
        .handle(GenerationRequest::text("a small cat"))
        .await
        .unwrap();
    let body = GenerationResponse::from(result).result.unwrap();
    assert_eq!(body.backend, "my-geometry");

    let result = gateway
        .handle_lightweight(GenerationRequest::text("a small cat"))
        .await
        .unwrap();
    assert_eq!(result.status, GenerationStatus::Completed);
    assert_eq!(result.model_type.as_deref(), Some("my-text"));
    assert_eq!(engine.runs(), 2);
}
