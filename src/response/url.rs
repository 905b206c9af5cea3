//! URL generation for persisted artifacts

/// Builds public URLs for files under the artifact store
#[derive(Debug, Clone)]
pub struct UrlHandler {
    prefix: String,
}

impl UrlHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// URL for a path relative to the storage root
    pub fn generate_url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.prefix, relative_path.trim_start_matches('/'))
    }
}
