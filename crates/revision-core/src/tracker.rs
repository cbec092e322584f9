//! Tracks the working document against the last persisted snapshot.
//!
//! Pure state: the tracker never persists, fetches, or notifies anything.
//! The editor session wraps it and emits events on dirty-state transitions.

use crate::diff::{ChangeSet, diff};
use crate::document::Document;

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    last_saved: Document,
    current: Document,
}

impl ChangeTracker {
    /// Start tracking from a persisted snapshot (both sides equal, clean).
    pub fn new(snapshot: Document) -> Self {
        Self {
            last_saved: snapshot.clone(),
            current: snapshot,
        }
    }

    /// Replace the working document. Called on every field edit; no
    /// validation happens here.
    pub fn set_current(&mut self, next: Document) {
        self.current = next;
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    pub fn last_saved(&self) -> &Document {
        &self.last_saved
    }

    /// Whether the working document differs from the last saved snapshot.
    pub fn has_unsaved_changes(&self) -> bool {
        !self.change_set().is_empty()
    }

    /// The current set of unsaved changes, for display.
    pub fn change_set(&self) -> ChangeSet {
        diff(&self.last_saved, &self.current)
    }

    /// Record a successful save or restore: `snapshot` becomes the new
    /// baseline and the dirty state clears accordingly.
    pub fn mark_saved(&mut self, snapshot: Document) {
        self.last_saved = snapshot;
    }
}
