//! HTTP inference engine client

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::traits::{
    ArtifactKind, EngineFile, InferenceEngine, Invocation, Options, Payload, TaskKind,
};
use crate::config::BackendConfig;
use crate::error::{AppError, Result};
use crate::response::base64;

/// Consecutive transport failures before an endpoint is skipped
const UNHEALTHY_AFTER: u32 = 3;

/// Inference worker endpoint with health status
#[derive(Debug, Clone)]
pub struct WorkerEndpoint {
    pub url: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
}

impl WorkerEndpoint {
    pub fn new(url: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            healthy: true,
            consecutive_failures: 0,
        }
    }

    pub fn mark_healthy(&mut self) {
        self.healthy = true;
        self.consecutive_failures = 0;
    }

    pub fn mark_unhealthy(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= UNHEALTHY_AFTER {
            self.healthy = false;
        }
    }
}

/// Engine reached through one or more remote inference workers
pub struct HttpEngine {
    name: String,
    model_id: String,
    client: Client,
    endpoints: Arc<RwLock<Vec<WorkerEndpoint>>>,
    health_check_path: String,
    probe_timeout: Duration,
    current_endpoint_index: Arc<RwLock<usize>>,
}

/// Wire request sent to `POST {endpoint}/infer`
#[derive(Debug, Serialize)]
struct InferRequest<'a> {
    task_id: &'a str,
    model: &'a str,
    task: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mesh_base64: Option<String>,
    options: &'a Options,
}

#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    files: Vec<InferFile>,
}

#[derive(Debug, Deserialize)]
struct InferFile {
    kind: ArtifactKind,
    format: String,
    data_base64: String,
}

#[derive(Debug, Deserialize)]
struct WorkerError {
    #[serde(default, alias = "detail")]
    error: Option<String>,
}

impl HttpEngine {
    /// Create a new HTTP engine from configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let endpoints: Vec<WorkerEndpoint> = config
            .endpoints
            .iter()
            .map(|url| WorkerEndpoint::new(url.clone()))
            .collect();

        Ok(Self {
            name: config.name.clone(),
            model_id: config.model_id.clone(),
            client,
            endpoints: Arc::new(RwLock::new(endpoints)),
            health_check_path: config.health_check_path.clone(),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            current_endpoint_index: Arc::new(RwLock::new(0)),
        })
    }

    /// Get the next healthy endpoint using round-robin.
    ///
    /// When every endpoint is marked unhealthy all of them are retried.
    fn get_next_endpoint(&self) -> Option<String> {
        let endpoints = self.endpoints.read();
        let mut healthy_endpoints: Vec<_> = endpoints.iter().filter(|e| e.healthy).collect();

        if healthy_endpoints.is_empty() {
            healthy_endpoints = endpoints.iter().collect();
        }

        if healthy_endpoints.is_empty() {
            return None;
        }

        let mut index = self.current_endpoint_index.write();
        let selected = *index % healthy_endpoints.len();
        *index = (selected + 1) % healthy_endpoints.len();
        Some(healthy_endpoints[selected].url.clone())
    }

    fn mark_endpoint_unhealthy(&self, url: &str) {
        let mut endpoints = self.endpoints.write();
        if let Some(endpoint) = endpoints.iter_mut().find(|e| e.url == url) {
            endpoint.mark_unhealthy();
            warn!(engine = %self.name, url = %url, failures = endpoint.consecutive_failures, "Inference worker failed");
        }
    }

    fn mark_endpoint_healthy(&self, url: &str) {
        let mut endpoints = self.endpoints.write();
        if let Some(endpoint) = endpoints.iter_mut().find(|e| e.url == url) {
            endpoint.mark_healthy();
        }
    }

    fn build_request<'a>(&'a self, invocation: &'a Invocation) -> InferRequest<'a> {
        let mut request = InferRequest {
            task_id: &invocation.task_id,
            model: &self.model_id,
            task: invocation.payload.task_kind(),
            prompt: None,
            image_base64: None,
            mesh_base64: None,
            options: &invocation.options,
        };

        match &invocation.payload {
            Payload::Prompt(prompt) => request.prompt = Some(prompt.as_str()),
            Payload::Image(image) => request.image_base64 = Some(base64::encode(image)),
            Payload::Texture { mesh, image } => {
                request.mesh_base64 = Some(base64::encode(mesh));
                request.image_base64 = Some(base64::encode(image));
            }
        }

        request
    }
}

#[async_trait]
impl InferenceEngine for HttpEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn probe(&self) -> Result<()> {
        let endpoints = self.endpoints.read().clone();
        if endpoints.is_empty() {
            return Err(AppError::BackendUnavailable(format!(
                "{} has no inference endpoint configured",
                self.name
            )));
        }

        let mut last_error = None;

        for endpoint in &endpoints {
            let url = format!("{}{}", endpoint.url, self.health_check_path);

            match self.client.get(&url).timeout(self.probe_timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    self.mark_endpoint_healthy(&endpoint.url);
                    debug!(engine = %self.name, endpoint = %endpoint.url, "Probe passed");
                    return Ok(());
                }
                Ok(response) => {
                    last_error = Some(format!("{} returned {}", url, response.status()));
                }
                Err(e) => {
                    last_error = Some(format!("{} unreachable: {}", url, e));
                }
            }
        }

        Err(AppError::BackendUnavailable(
            last_error.unwrap_or_else(|| format!("{} probe failed", self.name)),
        ))
    }

    async fn run(&self, invocation: &Invocation) -> Result<Vec<EngineFile>> {
        let endpoint = self.get_next_endpoint().ok_or_else(|| {
            AppError::BackendFailure(format!("{} has no inference worker configured", self.name))
        })?;

        debug!(engine = %self.name, endpoint = %endpoint, task_id = %invocation.task_id, "Sending inference request");

        let response = match self
            .client
            .post(format!("{}/infer", endpoint))
            .json(&self.build_request(invocation))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.mark_endpoint_unhealthy(&endpoint);
                warn!(engine = %self.name, endpoint = %endpoint, error = %e, "Inference request failed");
                let message = if e.is_timeout() {
                    "inference request timed out"
                } else {
                    "inference request failed"
                };
                return Err(AppError::BackendFailure(message.to_string()));
            }
        };

        self.mark_endpoint_healthy(&endpoint);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<WorkerError>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("Engine returned {}", status));
            return Err(AppError::BackendFailure(message));
        }

        let parsed: InferResponse = response
            .json()
            .await
            .map_err(|e| AppError::BackendFailure(format!("Failed to parse engine response: {}", e)))?;

        parsed
            .files
            .into_iter()
            .map(|file| {
                let data = base64::decode(&file.data_base64).map_err(|_| {
                    AppError::BackendFailure(format!(
                        "Engine returned undecodable {} data",
                        file.kind.as_str()
                    ))
                })?;
                Ok(EngineFile {
                    kind: file.kind,
                    format: sanitize_format(&file.format),
                    data,
                })
            })
            .collect()
    }
}

/// Keep engine-supplied extensions to short alphanumeric names
fn sanitize_format(format: &str) -> String {
    let cleaned: String = format
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();

    if cleaned.is_empty() {
        "bin".to_string()
    } else {
        cleaned
    }
}
