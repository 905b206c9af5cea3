//! Artifact store: persists engine output on the local filesystem

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::backend::traits::{ArtifactSet, EngineFile};
use crate::error::{AppError, Result};
use crate::response::url::UrlHandler;

/// Writes generated files under `{base}/{task_id}/` and hands out their URLs
pub struct ArtifactStore {
    storage_path: PathBuf,
    urls: UrlHandler,
}

impl ArtifactStore {
    pub fn new(storage_path: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            storage_path: storage_path.into(),
            urls: UrlHandler::new(url_prefix),
        }
    }

    /// Ensure the storage directory exists
    pub async fn ensure_storage_dir(&self) -> Result<()> {
        if !self.storage_path.exists() {
            fs::create_dir_all(&self.storage_path).await?;
            debug!(path = ?self.storage_path, "Created storage directory");
        }
        Ok(())
    }

    /// Directory holding one task's artifacts
    pub fn task_path(&self, task_id: &str) -> PathBuf {
        self.storage_path.join(task_id)
    }

    /// Persist every file of a task.
    ///
    /// Either all files are written or the task directory is removed again.
    pub async fn persist(&self, task_id: &str, files: &[EngineFile]) -> Result<ArtifactSet> {
        if task_id.is_empty() || task_id.contains(['/', '\\', '.']) {
            return Err(AppError::Internal(format!("Refusing to store task id '{}'", task_id)));
        }

        self.ensure_storage_dir().await?;
        let task_dir = self.task_path(task_id);
        fs::create_dir_all(&task_dir).await?;

        match self.write_files(task_id, &task_dir, files).await {
            Ok(artifacts) => Ok(artifacts),
            Err(e) => {
                self.remove_task(task_id).await;
                Err(e)
            }
        }
    }

    async fn write_files(
        &self,
        task_id: &str,
        task_dir: &Path,
        files: &[EngineFile],
    ) -> Result<ArtifactSet> {
        let mut artifacts = ArtifactSet::new();

        for file in files {
            if artifacts.contains_key(&file.kind) {
                warn!(task_id = %task_id, kind = file.kind.as_str(), "Ignoring duplicate artifact");
                continue;
            }

            let filename = format!("{}.{}", file.kind.as_str(), file.format);
            let file_path = task_dir.join(&filename);
            fs::write(&file_path, &file.data).await?;
            debug!(path = ?file_path, size = file.data.len(), "Saved artifact");

            let url = self.urls.generate_url(&format!("{}/{}", task_id, filename));
            artifacts.insert(file.kind, url);
        }

        Ok(artifacts)
    }

    /// Remove a task directory, ignoring a directory that is already gone
    pub async fn remove_task(&self, task_id: &str) {
        let task_dir = self.task_path(task_id);
        match fs::remove_dir_all(&task_dir).await {
            Ok(()) => debug!(path = ?task_dir, "Removed task artifacts"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?task_dir, error = %e, "Failed to remove task artifacts"),
        }
    }
}
