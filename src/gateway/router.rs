//! Routes a request to the adapter that should serve it

use std::sync::Arc;
use tracing::debug;

use crate::backend::registry::BackendRegistry;
use crate::backend::traits::{AdapterKind, BackendAdapter, TaskKind};
use crate::config::RoutingConfig;
use crate::error::{AppError, Result};

/// HTTP surface a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// `/generate/geometry`: geometry or lightweight backends
    Geometry,
    /// `/generate/texture`
    Texture,
    /// `/generate/text-to-3d` and `/generate/image-to-3d`
    Lightweight,
}

impl Surface {
    fn serves(&self, kind: AdapterKind) -> bool {
        match self {
            Surface::Geometry => matches!(kind, AdapterKind::Geometry | AdapterKind::Lightweight),
            Surface::Texture => kind == AdapterKind::Texture,
            Surface::Lightweight => kind == AdapterKind::Lightweight,
        }
    }

    /// Task id prefix for requests on this surface
    pub fn task_prefix(&self, task: TaskKind) -> &'static str {
        match (self, task) {
            (Surface::Lightweight, TaskKind::TextTo3d) => "text3d",
            (Surface::Lightweight, _) => "img3d",
            _ => task.task_prefix(),
        }
    }
}

/// Picks an adapter for a surface and task
pub struct BackendRouter {
    registry: Arc<BackendRegistry>,
    config: RoutingConfig,
}

impl BackendRouter {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self::with_config(registry, RoutingConfig::default())
    }

    pub fn with_config(registry: Arc<BackendRegistry>, config: RoutingConfig) -> Self {
        Self { registry, config }
    }

    fn default_backend(&self, surface: Surface, task: TaskKind) -> &str {
        match (surface, task) {
            (Surface::Texture, _) | (_, TaskKind::Texture) => &self.config.texture_default,
            (Surface::Geometry, _) => &self.config.geometry_default,
            (Surface::Lightweight, TaskKind::TextTo3d) => &self.config.lightweight_text_default,
            (Surface::Lightweight, TaskKind::ImageTo3d) => &self.config.lightweight_image_default,
        }
    }

    /// Resolve the requested backend, or the surface default.
    ///
    /// Fails with a client error when the name is unknown or the adapter
    /// cannot serve this surface or task.
    pub fn route(
        &self,
        surface: Surface,
        task: TaskKind,
        requested: Option<&str>,
    ) -> Result<Arc<dyn BackendAdapter>> {
        let name = requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.default_backend(surface, task));

        let adapter = self
            .registry
            .resolve(name)
            .map_err(|_| AppError::InvalidInput(format!("unknown backend '{}'", name)))?;

        if !surface.serves(adapter.kind()) || !adapter.accepts(task) {
            return Err(AppError::InvalidInput(format!(
                "backend '{}' cannot serve {} requests on this endpoint",
                name,
                task.as_str()
            )));
        }

        debug!(backend = %name, surface = ?surface, "Routed to backend");
        Ok(adapter)
    }
}
