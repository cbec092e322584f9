//! DocumentStorage trait abstraction over the external document service.
//!
//! Implementations:
//! - `InMemoryStorage` - For testing; seedable with canned versions
//! - `JsonFileStorage` (in revision-fs) - JSON files via tokio::fs
//!
//! The session layer only ever talks to storage through this trait, so the
//! backing service (remote API, filesystem, test double) is injected as an
//! explicit dependency.

use crate::document::Document;
use crate::version::{Version, VersionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// How a save is persisted.
///
/// A draft replaces the working slot in place; a final save creates a new
/// permanent history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveKind {
    Draft,
    Final,
}

/// Async boundary to wherever document versions actually live.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// List a document's versions, newest first. Called once when an editor
    /// opens.
    async fn fetch_versions(&self, document_id: &str) -> Result<Vec<Version>>;

    /// Persist a snapshot and return the stored version. Final saves come
    /// back with a server-assigned id and timestamp; drafts keep the
    /// working-slot id.
    async fn persist(
        &self,
        document_id: &str,
        snapshot: &Document,
        kind: SaveKind,
    ) -> Result<Version>;
}

// Implement DocumentStorage for Arc<T> where T: DocumentStorage
// This allows a test to keep its own handle on the storage it hands to a session
#[async_trait]
impl<T: DocumentStorage + Send + Sync> DocumentStorage for std::sync::Arc<T> {
    async fn fetch_versions(&self, document_id: &str) -> Result<Vec<Version>> {
        (**self).fetch_versions(document_id).await
    }

    async fn persist(
        &self,
        document_id: &str,
        snapshot: &Document,
        kind: SaveKind,
    ) -> Result<Version> {
        (**self).persist(document_id, snapshot, kind).await
    }
}

/// In-memory storage for testing
pub struct InMemoryStorage {
    author: String,
    documents: RwLock<HashMap<String, Vec<Version>>>,
    fail_next: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_author("local")
    }

    pub fn with_author(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            documents: RwLock::new(HashMap::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Seed a document's history (newest first) before opening a session.
    pub fn seed(&self, document_id: &str, versions: Vec<Version>) {
        let mut documents = self.documents.write().unwrap();
        documents.insert(document_id.to_string(), versions);
    }

    /// Make the next `persist` call fail, for simulating a storage outage.
    pub fn fail_next_persist(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    /// Number of stored versions for a document.
    pub fn version_count(&self, document_id: &str) -> usize {
        let documents = self.documents.read().unwrap();
        documents.get(document_id).map_or(0, Vec::len)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStorage for InMemoryStorage {
    async fn fetch_versions(&self, document_id: &str) -> Result<Vec<Version>> {
        let documents = self.documents.read().unwrap();
        Ok(documents.get(document_id).cloned().unwrap_or_default())
    }

    async fn persist(
        &self,
        document_id: &str,
        snapshot: &Document,
        kind: SaveKind,
    ) -> Result<Version> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(StorageError::Persistence("storage unavailable".into()));
        }

        let mut documents = self.documents.write().unwrap();
        let versions = documents.entry(document_id.to_string()).or_default();
        let version = stored_version(versions, snapshot, kind, &self.author);
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
        Ok(version)
    }
}

/// Build the version record a storage backend hands back for a save.
pub fn stored_version(
    existing: &[Version],
    snapshot: &Document,
    kind: SaveKind,
    author: &str,
) -> Version {
    match kind {
        SaveKind::Draft => Version::new(VersionId::working(), "Draft", author, snapshot.clone()),
        SaveKind::Final => {
            let n = existing.iter().filter(|v| !v.id.is_working()).count() + 1;
            Version::new(
                VersionId::generate(),
                format!("Version {n}"),
                author,
                snapshot.clone(),
            )
        }
    }
}
