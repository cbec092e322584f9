//! Version records and the per-document version history.
//!
//! A `Version` is an immutable snapshot of a document with authorship and
//! timestamp metadata. The store keeps them newest first and is append-only,
//! with one exception: the synthetic working slot (id `"current"`) holds the
//! latest draft-saved state of the live working copy and is replaced in
//! place rather than appended.

use crate::document::{Document, now_millis};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Reserved id of the working slot.
const WORKING_ID: &str = "current";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("Duplicate version id: {0}")]
    DuplicateVersionId(VersionId),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Identifier of a version. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved id of the live working copy's slot.
    pub fn working() -> Self {
        Self(WORKING_ID.to_string())
    }

    /// Generate a fresh unique id (for server-side "final" saves).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn is_working(&self) -> bool {
        self.0 == WORKING_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VersionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VersionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An immutable snapshot of a document at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: VersionId,
    pub label: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub author: String,
    pub snapshot: Document,
}

impl Version {
    /// Build a version stamped with the current time.
    pub fn new(
        id: VersionId,
        label: impl Into<String>,
        author: impl Into<String>,
        snapshot: Document,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            created_at: now_millis(),
            author: author.into(),
            snapshot,
        }
    }
}

/// Ordered history of a document's versions, newest first.
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    versions: Vec<Version>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a fetched history (newest first). Fails if the
    /// listing carries a duplicate id.
    pub fn from_versions(versions: Vec<Version>) -> Result<Self> {
        let mut store = Self::new();
        for version in versions.into_iter().rev() {
            if version.id.is_working() {
                store.upsert_working(version);
            } else {
                store.append(version)?;
            }
        }
        Ok(store)
    }

    /// All versions, newest first.
    pub fn list(&self) -> &[Version] {
        &self.versions
    }

    /// The newest entry (the working slot when one exists).
    pub fn latest(&self) -> Option<&Version> {
        self.versions.first()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        self.versions.iter().any(|v| &v.id == id)
    }

    /// Look up a version by id.
    pub fn select(&self, id: &VersionId) -> Result<&Version> {
        self.versions
            .iter()
            .find(|v| &v.id == id)
            .ok_or_else(|| StoreError::VersionNotFound(id.clone()))
    }

    /// Add a permanent history entry ("save as final"). The store is left
    /// untouched when the id already exists.
    pub fn append(&mut self, version: Version) -> Result<()> {
        if self.contains(&version.id) {
            return Err(StoreError::DuplicateVersionId(version.id));
        }
        // The working slot stays on top; history entries go right below it.
        let at = usize::from(self.versions.first().is_some_and(|v| v.id.is_working()));
        self.versions.insert(at, version);
        Ok(())
    }

    /// Replace (or create) the working slot after a draft save.
    pub fn upsert_working(&mut self, version: Version) {
        debug_assert!(version.id.is_working());
        match self.versions.iter_mut().find(|v| v.id.is_working()) {
            Some(slot) => *slot = version,
            None => self.versions.insert(0, version),
        }
    }

    /// Remove and return the working slot, if present. A final save promotes
    /// the draft into permanent history, consuming the slot.
    pub fn take_working(&mut self) -> Option<Version> {
        let at = self.versions.iter().position(|v| v.id.is_working())?;
        Some(self.versions.remove(at))
    }
}
