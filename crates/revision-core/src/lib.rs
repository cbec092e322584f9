//! revision-core: Document snapshots, structural diffing, and version
//! reconciliation for the document editor.
//!
//! This crate provides the core functionality for:
//! - Modeling editable documents (nested fields, line-item lists)
//! - Detecting unsaved changes against the last saved snapshot
//! - Keeping an append-only version history with a replaceable working slot
//! - Guarding version switches behind a discard/save/cancel confirmation
//! - The DocumentStorage trait abstraction over the document service

pub mod diff;
pub mod document;
pub mod events;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod version;

pub use diff::{ChangeSet, FieldChange, diff};
pub use document::{Document, Field, FieldPath, ItemId, LineItem, PathError};
pub use events::{EditorEvent, EventBus, Subscription};
pub use session::{Choice, EditorSession, SessionError, SessionState, SwitchOutcome};
pub use storage::{DocumentStorage, InMemoryStorage, SaveKind, StorageError};
pub use tracker::ChangeTracker;
pub use version::{StoreError, Version, VersionId, VersionStore};
