//! JSON-file document storage using tokio::fs.
//!
//! Each document's history lives in `<root>/<document_id>.json` as a
//! newest-first list of versions. Draft saves replace the working slot in
//! the file; final saves insert a fresh immutable entry below it.

use async_trait::async_trait;
use revision_core::storage::{DocumentStorage, Result, SaveKind, StorageError, stored_version};
use revision_core::{Document, Version};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Filesystem-backed storage rooted at a directory.
pub struct JsonFileStorage {
    root: PathBuf,
    author: String,
}

impl JsonFileStorage {
    pub fn new(root: impl Into<PathBuf>, author: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            author: author.into(),
        }
    }

    fn document_path(&self, document_id: &str) -> PathBuf {
        self.root.join(format!("{document_id}.json"))
    }

    async fn load_versions(&self, path: &Path) -> Result<Vec<Version>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::Persistence(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| StorageError::Persistence(e.to_string()))
    }

    async fn save_versions(&self, path: &Path, versions: &[Version]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Persistence(e.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(versions)
            .map_err(|e| StorageError::Persistence(e.to_string()))?;
        fs::write(path, contents)
            .await
            .map_err(|e| StorageError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl DocumentStorage for JsonFileStorage {
    async fn fetch_versions(&self, document_id: &str) -> Result<Vec<Version>> {
        let path = self.document_path(document_id);
        let versions = self.load_versions(&path).await?;
        debug!(document_id, count = versions.len(), "fetched versions");
        Ok(versions)
    }

    async fn persist(
        &self,
        document_id: &str,
        snapshot: &Document,
        kind: SaveKind,
    ) -> Result<Version> {
        let path = self.document_path(document_id);
        let mut versions = self.load_versions(&path).await?;

        let version = stored_version(&versions, snapshot, kind, &self.author);
        match kind {
            SaveKind::Draft => match versions.iter_mut().find(|v| v.id.is_working()) {
                Some(slot) => *slot = version.clone(),
                None => versions.insert(0, version.clone()),
            },
            SaveKind::Final => {
                // Promotion consumes any draft in the working slot.
                versions.retain(|v| !v.id.is_working());
                versions.insert(0, version.clone());
            }
        }

        self.save_versions(&path, &versions).await?;
        debug!(document_id, id = %version.id, ?kind, "persisted version");
        Ok(version)
    }
}
