//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

fn default_rps() -> u32 {
    10
}

fn default_burst() -> u32 {
    20
}

/// Artifact storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub base_path: String,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            url_prefix: default_url_prefix(),
        }
    }
}

fn default_storage_path() -> String {
    "./outputs".to_string()
}

fn default_url_prefix() -> String {
    "/files".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Request gateway tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Upper bound for a single adapter invocation
    #[serde(default = "default_invoke_timeout")]
    pub invoke_timeout_ms: u64,
    /// Adapter invocations allowed to run at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Requests allowed to wait for a free invocation slot
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Probe every backend at startup instead of on first use
    #[serde(default = "default_true")]
    pub eager_init: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: default_invoke_timeout(),
            max_concurrent: default_max_concurrent(),
            max_pending: default_max_pending(),
            max_prompt_chars: default_max_prompt_chars(),
            max_image_bytes: default_max_image_bytes(),
            eager_init: true,
        }
    }
}

fn default_invoke_timeout() -> u64 {
    300_000
}

fn default_max_concurrent() -> usize {
    2
}

fn default_max_pending() -> usize {
    64
}

fn default_max_prompt_chars() -> usize {
    1000
}

fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

/// Backend used by each endpoint when a request names none
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default = "default_geometry_backend")]
    pub geometry_default: String,
    #[serde(default = "default_texture_backend")]
    pub texture_default: String,
    #[serde(default = "default_text_backend")]
    pub lightweight_text_default: String,
    #[serde(default = "default_image_backend")]
    pub lightweight_image_default: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            geometry_default: default_geometry_backend(),
            texture_default: default_texture_backend(),
            lightweight_text_default: default_text_backend(),
            lightweight_image_default: default_image_backend(),
        }
    }
}

fn default_geometry_backend() -> String {
    "hunyuan-dit".to_string()
}

fn default_texture_backend() -> String {
    "hunyuan-paint".to_string()
}

fn default_text_backend() -> String {
    "shap-e".to_string()
}

fn default_image_backend() -> String {
    "zero123".to_string()
}

/// Placeholder artifacts returned while an engine is unavailable
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "default_sim_mesh_url")]
    pub mesh_url: String,
    #[serde(default = "default_sim_texture_url")]
    pub texture_url: String,
    #[serde(default = "default_sim_thumbnail_url")]
    pub thumbnail_url: String,
    #[serde(default = "default_sim_format")]
    pub format: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mesh_url: default_sim_mesh_url(),
            texture_url: default_sim_texture_url(),
            thumbnail_url: default_sim_thumbnail_url(),
            format: default_sim_format(),
        }
    }
}

fn default_sim_mesh_url() -> String {
    "/api/demo-model.glb".to_string()
}

fn default_sim_texture_url() -> String {
    "/api/demo-texture.jpg".to_string()
}

fn default_sim_thumbnail_url() -> String {
    "/placeholder.jpg".to_string()
}

fn default_sim_format() -> String {
    "glb".to_string()
}

/// Cross-origin configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

/// Backend (adapter + engine) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub name: String,
    /// "geometry", "texture" or "lightweight"
    pub kind: String,
    /// For lightweight backends: "text" or "image"
    #[serde(default)]
    pub input: Option<String>,
    pub model_id: String,
    /// Inference worker base URLs; none means simulation only
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Bound on each capability probe request
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_probe_timeout() -> u64 {
    5000
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_timeout() -> u64 {
    600_000
}

impl BackendConfig {
    fn simulated(name: &str, kind: &str, input: Option<&str>, model_id: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            input: input.map(str::to_string),
            model_id: model_id.to_string(),
            endpoints: vec![],
            health_check_path: default_health_check_path(),
            timeout_ms: default_timeout(),
            probe_timeout_ms: default_probe_timeout(),
            enabled: true,
        }
    }
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::simulated(
            "hunyuan-dit",
            "geometry",
            None,
            "tencent/Hunyuan3D-2mini/hunyuan3d-dit-v2-mini",
        ),
        BackendConfig::simulated(
            "hunyuan-paint",
            "texture",
            None,
            "tencent/Hunyuan3D-2/hunyuan3d-paint-v2-0",
        ),
        BackendConfig::simulated("shap-e", "lightweight", Some("text"), "openai/shap-e"),
        BackendConfig::simulated("dreamgaussian", "lightweight", Some("text"), "dreamgaussian"),
        BackendConfig::simulated("instant3d", "lightweight", Some("text"), "instant3d"),
        BackendConfig::simulated("zero123", "lightweight", Some("image"), "zero123"),
        BackendConfig::simulated("pifu", "lightweight", Some("image"), "pifu"),
    ]
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("logging.level", default_log_level())?
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with MESH_GATEWAY_)
            .add_source(
                Environment::with_prefix("MESH_GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0".to_string()));
        }

        if self.gateway.max_concurrent == 0 {
            return Err(invalid("gateway.max_concurrent must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.is_empty() {
                return Err(invalid("Backend name cannot be empty".to_string()));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(invalid(format!("Backend '{}' is declared twice", backend.name)));
            }
            if !["geometry", "texture", "lightweight"].contains(&backend.kind.as_str()) {
                return Err(invalid(format!(
                    "Backend '{}' has invalid kind '{}'. Must be 'geometry', 'texture' or 'lightweight'",
                    backend.name, backend.kind
                )));
            }
            if backend.kind == "lightweight"
                && !matches!(backend.input.as_deref(), Some("text") | Some("image"))
            {
                return Err(invalid(format!(
                    "Lightweight backend '{}' must set input to 'text' or 'image'",
                    backend.name
                )));
            }
        }

        self.validate_routing()
    }

    /// Every endpoint default must name a backend able to serve that endpoint
    fn validate_routing(&self) -> Result<()> {
        let routing = &self.routing;
        let checks: [(&str, &str, fn(&BackendConfig) -> bool); 4] = [
            ("geometry_default", routing.geometry_default.as_str(), |b| {
                b.kind == "geometry" || b.kind == "lightweight"
            }),
            ("texture_default", routing.texture_default.as_str(), |b| b.kind == "texture"),
            ("lightweight_text_default", routing.lightweight_text_default.as_str(), |b| {
                b.kind == "lightweight" && b.input.as_deref() == Some("text")
            }),
            ("lightweight_image_default", routing.lightweight_image_default.as_str(), |b| {
                b.kind == "lightweight" && b.input.as_deref() == Some("image")
            }),
        ];

        for (key, name, serves) in checks {
            match self.backends.iter().find(|b| b.name == name) {
                None => {
                    return Err(invalid(format!(
                        "routing.{} names unknown backend '{}'",
                        key, name
                    )))
                }
                Some(backend) if !serves(backend) => {
                    return Err(invalid(format!(
                        "routing.{} backend '{}' cannot serve that endpoint",
                        key, name
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            gateway: GatewayConfig::default(),
            routing: RoutingConfig::default(),
            simulation: SimulationConfig::default(),
            cors: CorsConfig::default(),
            backends: default_backends(),
        }
    }
}

fn invalid(message: String) -> AppError {
    AppError::Config(config::ConfigError::Message(message))
}
