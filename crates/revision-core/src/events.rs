//! Event infrastructure for the editor core.
//!
//! Provides `EditorEvent` for the presentation layer (dirty badge,
//! confirmation dialog, history list) and `EventBus` for subscriptions.
//! Thread-safe for use in a multi-threaded Tokio runtime; wrap the bus in
//! `Arc` to enable subscriptions.

use crate::diff::ChangeSet;
use crate::storage::SaveKind;
use crate::version::VersionId;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Events emitted by the editor session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// The unsaved-changes state flipped. Emitted on transitions only.
    DirtyChanged {
        /// Whether the working document now differs from the last save.
        dirty: bool,
    },
    /// A version switch is blocked on a user choice. The presentation layer
    /// shows the pending changes and answers via `EditorSession::resolve`.
    ConfirmationRequired {
        /// The unsaved changes that would be lost by switching.
        changes: ChangeSet,
    },
    /// The working document was replaced by a version's snapshot.
    VersionRestored {
        /// Id of the restored version.
        id: VersionId,
    },
    /// A save completed and the store was updated.
    VersionSaved {
        /// Id of the persisted version.
        id: VersionId,
        /// Whether this was a draft or a final save.
        kind: SaveKind,
    },
    /// A save was rejected by storage; the working document is untouched.
    SaveFailed {
        /// Human-readable failure description.
        message: String,
    },
}

/// Subscription handle that unsubscribes automatically when dropped.
///
/// Follows the disposer pattern: hold this value to keep receiving events,
/// drop it (or let it go out of scope) to unsubscribe.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: usize,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

/// Event bus for publishing editor events to subscribers.
pub struct EventBus {
    callbacks: RwLock<Vec<(usize, Arc<dyn Fn(EditorEvent) + Send + Sync>)>>,
    next_id: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events. Returns `Subscription` that unsubscribes on drop.
    ///
    /// Requires `self` to be wrapped in `Arc`.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(EditorEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        Subscription {
            bus: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: usize) {
        // Use try_write to avoid deadlock if Drop runs during panic unwinding
        // while a read lock is held (e.g., during emit).
        if let Ok(mut guard) = self.callbacks.try_write() {
            guard.retain(|(i, _)| *i != id);
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // Clone the callback list to prevent deadlock if a callback calls subscribe.
        let callbacks: Vec<_> = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event.clone());
        }
    }
}
