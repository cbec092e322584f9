//! EditorSession: orchestrates version switching and saving for one open
//! document.
//!
//! The session is the only path by which the current-version pointer moves.
//! It runs a small state machine:
//!
//! - `Idle` - edits flow in via `update_working`; switches and saves start here
//! - `ConfirmPending` - a switch hit unsaved changes and is blocked on a user
//!   choice (discard / save-and-switch / cancel)
//! - `Saving` - one save is in flight; further switches and saves are
//!   rejected until it resolves
//!
//! Persistence failures never touch the working document: the machine falls
//! back to its pre-save state and surfaces the error. Only a successful save
//! moves the baseline or the store.

use crate::diff::ChangeSet;
use crate::document::Document;
use crate::events::{EditorEvent, EventBus};
use crate::storage::{DocumentStorage, SaveKind, StorageError};
use crate::tracker::ChangeTracker;
use crate::version::{StoreError, Version, VersionId, VersionStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A save is already in flight")]
    SaveInFlight,

    #[error("A confirmation prompt is pending")]
    PromptPending,

    #[error("No confirmation prompt is pending")]
    NoPrompt,

    #[error("Version store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Where the session's state machine currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ConfirmPending,
    Saving,
}

/// The user's answer to a blocking confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Choice {
    /// Drop the working edits and switch to the pending target.
    Discard,
    /// Persist the working document as a final version, then switch.
    SaveAndSwitch,
    /// Keep editing; the pending switch is abandoned.
    Cancel,
}

/// What `request_switch` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The target was restored immediately (no unsaved changes).
    Switched,
    /// Unsaved changes exist; a confirmation prompt was raised and the
    /// switch is parked until `resolve` is called.
    ConfirmationRequired,
}

/// Editing session for a single document.
pub struct EditorSession<S: DocumentStorage> {
    document_id: String,
    storage: S,
    tracker: ChangeTracker,
    store: VersionStore,
    events: Arc<EventBus>,
    state: SessionState,
    pending_target: Option<VersionId>,
    current_version: Option<VersionId>,
    was_dirty: bool,
}

impl<S: DocumentStorage> EditorSession<S> {
    /// Open an editor for `document_id`: fetch its versions once and seed
    /// the working document from the newest one (or start empty for a
    /// brand-new document).
    pub async fn open(storage: S, document_id: impl Into<String>) -> Result<Self> {
        let document_id = document_id.into();
        let versions = storage.fetch_versions(&document_id).await?;
        debug!(%document_id, count = versions.len(), "opening editor session");

        let store = VersionStore::from_versions(versions)?;
        let (snapshot, current_version) = match store.latest() {
            Some(version) => (version.snapshot.clone(), Some(version.id.clone())),
            None => (Document::new(), None),
        };

        Ok(Self {
            document_id,
            storage,
            tracker: ChangeTracker::new(snapshot),
            store,
            events: Arc::new(EventBus::new()),
            state: SessionState::Idle,
            pending_target: None,
            current_version,
            was_dirty: false,
        })
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The event bus; subscribe here for dirty/prompt/save notifications.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The version history, newest first.
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// The live working document.
    pub fn current(&self) -> &Document {
        self.tracker.current()
    }

    /// Which version the editor currently sits on, if any.
    pub fn current_version(&self) -> Option<&VersionId> {
        self.current_version.as_ref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker.has_unsaved_changes()
    }

    /// The unsaved changes against the last saved snapshot.
    pub fn change_set(&self) -> ChangeSet {
        self.tracker.change_set()
    }

    /// Replace the working document after an edit. Fires `DirtyChanged`
    /// when the unsaved-changes state flips.
    pub fn update_working(&mut self, next: Document) {
        self.tracker.set_current(next);
        self.emit_dirty();
    }

    /// Ask to move the editor onto `target`.
    ///
    /// Clean sessions switch immediately. Dirty sessions park the target,
    /// raise `ConfirmationRequired`, and wait for `resolve`.
    pub fn request_switch(&mut self, target: &VersionId) -> Result<SwitchOutcome> {
        match self.state {
            SessionState::Saving => return Err(SessionError::SaveInFlight),
            SessionState::ConfirmPending => return Err(SessionError::PromptPending),
            SessionState::Idle => {}
        }

        let version = self.store.select(target)?.clone();
        if !self.tracker.has_unsaved_changes() {
            debug!(version = %target, "switching version");
            self.restore(&version);
            return Ok(SwitchOutcome::Switched);
        }

        debug!(version = %target, "switch blocked on unsaved changes");
        self.pending_target = Some(version.id);
        self.state = SessionState::ConfirmPending;
        self.events.emit(EditorEvent::ConfirmationRequired {
            changes: self.tracker.change_set(),
        });
        Ok(SwitchOutcome::ConfirmationRequired)
    }

    /// Answer the pending confirmation prompt.
    pub async fn resolve(&mut self, choice: Choice) -> Result<()> {
        if self.state != SessionState::ConfirmPending {
            return Err(SessionError::NoPrompt);
        }
        let Some(target) = self.pending_target.clone() else {
            return Err(SessionError::NoPrompt);
        };

        match choice {
            Choice::Cancel => {
                debug!("switch cancelled, keeping working edits");
                self.pending_target = None;
                self.state = SessionState::Idle;
                Ok(())
            }
            Choice::Discard => {
                debug!(version = %target, "discarding working edits");
                let version = self.store.select(&target)?.clone();
                self.pending_target = None;
                self.state = SessionState::Idle;
                self.restore(&version);
                Ok(())
            }
            Choice::SaveAndSwitch => {
                self.state = SessionState::Saving;
                let saved = match self.persist(SaveKind::Final).await {
                    Ok(saved) => saved,
                    Err(err) => {
                        // Back to the prompt with nothing mutated; the
                        // pending target stays parked.
                        self.state = SessionState::ConfirmPending;
                        return Err(err);
                    }
                };
                if let Err(err) = self.adopt_saved(&saved, SaveKind::Final) {
                    self.state = SessionState::ConfirmPending;
                    return Err(err);
                }
                let version = self.store.select(&target)?.clone();
                self.pending_target = None;
                self.state = SessionState::Idle;
                self.restore(&version);
                Ok(())
            }
        }
    }

    /// The prompt was dismissed without an explicit choice; treated as
    /// cancel. No-op when nothing is pending.
    pub fn dismiss(&mut self) {
        if self.state == SessionState::ConfirmPending {
            self.pending_target = None;
            self.state = SessionState::Idle;
        }
    }

    /// Persist the working document.
    ///
    /// `Draft` updates the working slot in place; `Final` adds a permanent
    /// history entry. On failure the session returns to `Idle` with the
    /// working document and the store untouched.
    pub async fn save(&mut self, kind: SaveKind) -> Result<Version> {
        match self.state {
            SessionState::Saving => return Err(SessionError::SaveInFlight),
            SessionState::ConfirmPending => return Err(SessionError::PromptPending),
            SessionState::Idle => {}
        }

        self.state = SessionState::Saving;
        let saved = match self.persist(kind).await {
            Ok(saved) => saved,
            Err(err) => {
                self.state = SessionState::Idle;
                return Err(err);
            }
        };
        if let Err(err) = self.adopt_saved(&saved, kind) {
            self.state = SessionState::Idle;
            return Err(err);
        }
        self.state = SessionState::Idle;
        Ok(saved)
    }

    /// Run the storage call and surface failures as events too.
    async fn persist(&self, kind: SaveKind) -> Result<Version> {
        debug!(document_id = %self.document_id, ?kind, "persisting");
        match self
            .storage
            .persist(&self.document_id, self.tracker.current(), kind)
            .await
        {
            Ok(saved) => Ok(saved),
            Err(err) => {
                warn!(document_id = %self.document_id, %err, "persist failed");
                self.events.emit(EditorEvent::SaveFailed {
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Fold a successful save back into the store and the tracker.
    fn adopt_saved(&mut self, saved: &Version, kind: SaveKind) -> Result<()> {
        match kind {
            SaveKind::Draft => self.store.upsert_working(saved.clone()),
            SaveKind::Final => {
                self.store.append(saved.clone())?;
                // Promotion consumes any draft in the working slot.
                self.store.take_working();
            }
        }
        self.tracker.mark_saved(saved.snapshot.clone());
        self.current_version = Some(saved.id.clone());
        self.events.emit(EditorEvent::VersionSaved {
            id: saved.id.clone(),
            kind,
        });
        self.emit_dirty();
        Ok(())
    }

    /// Adopt a version's snapshot as both the working document and the
    /// baseline, and move the pointer.
    fn restore(&mut self, version: &Version) {
        self.tracker.set_current(version.snapshot.clone());
        self.tracker.mark_saved(version.snapshot.clone());
        self.current_version = Some(version.id.clone());
        self.events.emit(EditorEvent::VersionRestored {
            id: version.id.clone(),
        });
        self.emit_dirty();
    }

    fn emit_dirty(&mut self) {
        let dirty = self.tracker.has_unsaved_changes();
        if dirty != self.was_dirty {
            self.was_dirty = dirty;
            self.events.emit(EditorEvent::DirtyChanged { dirty });
        }
    }
}
