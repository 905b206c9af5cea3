//! Functional tests for the HTTP inference engine against a mock worker

use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mesh_gen_gateway::backend::adapter::Placeholders;
use mesh_gen_gateway::backend::http_engine::HttpEngine;
use mesh_gen_gateway::backend::registry::BackendRegistry;
use mesh_gen_gateway::backend::traits::{
    AdapterOutput, AdapterState, ArtifactKind, BackendAdapter, InferenceEngine, Invocation, Options,
    Payload,
};
use mesh_gen_gateway::config::BackendConfig;
use mesh_gen_gateway::response::base64;
use mesh_gen_gateway::AppError;

fn backend_config(name: &str, kind: &str, endpoints: Vec<String>) -> BackendConfig {
    BackendConfig {
        name: name.to_string(),
        kind: kind.to_string(),
        input: None,
        model_id: "test/hunyuan3d-dit".to_string(),
        endpoints,
        health_check_path: "/health".to_string(),
        timeout_ms: 5_000,
        probe_timeout_ms: 1_000,
        enabled: true,
    }
}

fn invocation(payload: Payload) -> Invocation {
    Invocation {
        task_id: "geom_test".to_string(),
        payload,
        options: Options::new(),
    }
}

async fn worker() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_probe_healthy_worker() {
    let server = worker().await;
    let engine = HttpEngine::new(&backend_config("geo", "geometry", vec![server.uri()])).unwrap();

    assert!(engine.probe().await.is_ok());
}

#[tokio::test]
async fn test_probe_failing_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = HttpEngine::new(&backend_config("geo", "geometry", vec![server.uri()])).unwrap();

    assert!(matches!(engine.probe().await, Err(AppError::BackendUnavailable(_))));
}

#[tokio::test]
async fn test_probe_without_endpoints() {
    let engine = HttpEngine::new(&backend_config("geo", "geometry", vec![])).unwrap();

    assert!(matches!(engine.probe().await, Err(AppError::BackendUnavailable(_))));
}

#[tokio::test]
async fn test_run_returns_decoded_files() {
    let server = worker().await;
    Mock::given(method("POST"))
        .and(path("/infer"))
        .and(body_partial_json(json!({
            "task_id": "geom_test",
            "model": "test/hunyuan3d-dit",
            "task": "text-to-3d",
            "prompt": "a small cat",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"kind": "mesh", "format": ".GLB", "data_base64": base64::encode(b"glTF-mesh")},
                {"kind": "thumbnail", "format": "jpg", "data_base64": base64::encode(b"thumb")},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = HttpEngine::new(&backend_config("geo", "geometry", vec![server.uri()])).unwrap();
    let files = engine
        .run(&invocation(Payload::Prompt("a small cat".to_string())))
        .await
        .unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].kind, ArtifactKind::Mesh);
    assert_eq!(files[0].format, "glb");
    assert_eq!(files[0].data, b"glTF-mesh");
}

#[tokio::test]
async fn test_run_surfaces_worker_error() {
    let server = worker().await;
    Mock::given(method("POST"))
        .and(path("/infer"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "model crashed"})))
        .mount(&server)
        .await;

    let engine = HttpEngine::new(&backend_config("geo", "geometry", vec![server.uri()])).unwrap();
    let err = engine
        .run(&invocation(Payload::Image(vec![1, 2, 3])))
        .await
        .unwrap_err();

    match err {
        AppError::BackendFailure(message) => assert_eq!(message, "model crashed"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_registry_adapter_uses_live_worker() {
    let server = worker().await;
    Mock::given(method("POST"))
        .and(path("/infer"))
        .and(body_partial_json(json!({"task": "texture"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"kind": "mesh", "format": "glb", "data_base64": base64::encode(b"painted")},
                {"kind": "texture", "format": "png", "data_base64": base64::encode(b"albedo")},
            ]
        })))
        .mount(&server)
        .await;

    let registry = Arc::new(BackendRegistry::new());
    registry
        .initialize_from_config(
            &[backend_config("paint", "texture", vec![server.uri()])],
            &Placeholders::default(),
            true,
        )
        .await
        .unwrap();

    let adapter = registry.resolve("paint").unwrap();
    assert_eq!(adapter.state(), AdapterState::Ready);
    assert!(!adapter.status().simulation);

    let output = adapter
        .invoke(&invocation(Payload::Texture {
            mesh: b"mesh".to_vec(),
            image: b"image".to_vec(),
        }))
        .await
        .unwrap();

    match output {
        AdapterOutput::Generated(files) => {
            assert!(files.iter().any(|f| f.kind == ArtifactKind::Texture));
        }
        AdapterOutput::Simulated { .. } => panic!("expected generated output"),
    }
}

#[tokio::test]
async fn test_unreachable_worker_falls_back_to_simulation() {
    let registry = BackendRegistry::new();
    registry
        .initialize_from_config(
            &[backend_config("geo", "geometry", vec!["http://127.0.0.1:9".to_string()])],
            &Placeholders::default(),
            true,
        )
        .await
        .unwrap();

    let adapter = registry.resolve("geo").unwrap();
    assert_eq!(adapter.state(), AdapterState::Unavailable);

    let output = adapter
        .invoke(&invocation(Payload::Prompt("a small cat".to_string())))
        .await
        .unwrap();
    assert!(matches!(output, AdapterOutput::Simulated { .. }));
}

#[tokio::test]
async fn test_probe_uses_short_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = backend_config("geo", "geometry", vec![server.uri()]);
    config.timeout_ms = 600_000;
    config.probe_timeout_ms = 200;
    let engine = HttpEngine::new(&config).unwrap();

    let started = Instant::now();
    let result = engine.probe().await;

    assert!(matches!(result, Err(AppError::BackendUnavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_transport_error_hides_worker_address() {
    let engine =
        HttpEngine::new(&backend_config("geo", "geometry", vec!["http://127.0.0.1:9".to_string()])).unwrap();

    let err = engine
        .run(&invocation(Payload::Prompt("a small cat".to_string())))
        .await
        .unwrap_err();

    match err {
        AppError::BackendFailure(message) => {
            assert_eq!(message, "inference request failed");
            assert!(!message.contains("127.0.0.1"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
