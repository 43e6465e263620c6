//! Document store backed by a single TOML or JSON file.
//!
//! The file is re-read on every fetch, so edits show up on the next poll
//! (or immediately when the store watcher is enabled).

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;

use crate::store::{RouteStore, StoreError, StoreSnapshot};

/// Reads `[[backends]]` and `[[routes]]` from a document on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    fn parse(&self, content: &str) -> Result<StoreSnapshot, StoreError> {
        if self.is_json() {
            serde_json::from_str(content).map_err(|e| StoreError::Malformed(e.to_string()))
        } else {
            toml::from_str(content).map_err(|e| StoreError::Malformed(e.to_string()))
        }
    }
}

#[async_trait]
impl RouteStore for FileStore {
    async fn fetch(&self) -> Result<StoreSnapshot, StoreError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            StoreError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        self.parse(&content)
    }

    async fn revision(&self) -> Result<Option<String>, StoreError> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos());

        Ok(modified.map(|nanos| format!("{}-{}", nanos, metadata.len())))
    }
}
