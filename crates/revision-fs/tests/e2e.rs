//! End-to-end tests for revision-fs.
//!
//! Exercises full editor flows against real files: opening a session,
//! editing, draft and final saves, dirty-switch confirmation, and history
//! surviving a restart.

use anyhow::Result;
use revision_core::{
    Choice, Document, EditorSession, FieldPath, SaveKind, SessionState, SwitchOutcome, VersionId,
};
use revision_fs::JsonFileStorage;
use serde_json::json;
use tempfile::TempDir;

fn invoice(number: &str) -> Document {
    Document::from_value(json!({
        "number": number,
        "seller": { "name": "Acme GmbH" },
        "items": [],
    }))
    .unwrap()
}

fn renumbered(session: &EditorSession<JsonFileStorage>, number: &str) -> Document {
    let mut doc = session.current().clone();
    doc.set_value(&FieldPath::key("number"), json!(number)).unwrap();
    doc
}

// ============================================================================
// Full editing flows
// ============================================================================

#[tokio::test]
async fn test_edit_save_reopen_round_trip() -> Result<()> {
    let dir = TempDir::new()?;

    // First session: draft an invoice, then finalize it.
    {
        let storage = JsonFileStorage::new(dir.path(), "rae");
        let mut session = EditorSession::open(storage, "invoice-7").await?;
        assert!(session.current().is_empty());

        session.update_working(invoice("INV-1"));
        assert!(session.has_unsaved_changes());

        session.save(SaveKind::Draft).await?;
        assert!(!session.has_unsaved_changes());

        session.update_working(renumbered(&session, "INV-2"));
        session.save(SaveKind::Final).await?;
        // Finalizing promoted the draft: one immutable entry, no draft slot.
        assert_eq!(session.store().len(), 1);
    }

    // Second session: history survived the restart.
    {
        let storage = JsonFileStorage::new(dir.path(), "rae");
        let session = EditorSession::open(storage, "invoice-7").await?;
        assert_eq!(session.store().len(), 1);
        assert!(!session.has_unsaved_changes());
        // The newest entry carries the finalized snapshot.
        assert_eq!(session.current(), &invoice("INV-2"));
    }

    Ok(())
}

#[tokio::test]
async fn test_dirty_switch_discard_flow() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path(), "rae");

    // Build two final versions to switch between.
    let mut session = EditorSession::open(storage, "invoice-9").await?;
    session.update_working(invoice("INV-1"));
    let v1 = session.save(SaveKind::Final).await?;
    session.update_working(renumbered(&session, "INV-2"));
    session.save(SaveKind::Final).await?;

    // Edit, then try to jump back to v1.
    session.update_working(renumbered(&session, "INV-3"));
    let outcome = session.request_switch(&v1.id)?;
    assert_eq!(outcome, SwitchOutcome::ConfirmationRequired);
    assert_eq!(session.state(), SessionState::ConfirmPending);

    session.resolve(Choice::Discard).await?;
    assert_eq!(session.current(), &invoice("INV-1"));
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.current_version(), Some(&v1.id));

    Ok(())
}

#[tokio::test]
async fn test_dirty_switch_save_and_switch_flow() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path(), "rae");

    let mut session = EditorSession::open(storage, "contract-3").await?;
    session.update_working(invoice("INV-1"));
    let v1 = session.save(SaveKind::Final).await?;

    session.update_working(renumbered(&session, "INV-2"));
    session.request_switch(&v1.id)?;
    let before = session.store().len();

    session.resolve(Choice::SaveAndSwitch).await?;

    // The edits became a new final version, then v1 was restored.
    assert_eq!(session.store().len(), before + 1);
    assert_eq!(session.current(), &invoice("INV-1"));
    assert!(!session.has_unsaved_changes());

    // Both versions are on disk for the next session.
    let storage = JsonFileStorage::new(dir.path(), "rae");
    let reopened = EditorSession::open(storage, "contract-3").await?;
    assert!(
        reopened
            .store()
            .list()
            .iter()
            .any(|v| v.snapshot == invoice("INV-2"))
    );

    Ok(())
}

#[tokio::test]
async fn test_draft_saves_do_not_grow_history() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path(), "rae");

    let mut session = EditorSession::open(storage, "invoice-4").await?;
    for n in 1..=3 {
        session.update_working(invoice(&format!("INV-{n}")));
        session.save(SaveKind::Draft).await?;
    }

    // One working slot, no matter how many drafts.
    assert_eq!(session.store().len(), 1);
    assert!(session.store().latest().unwrap().id.is_working());

    let storage = JsonFileStorage::new(dir.path(), "rae");
    let reopened = EditorSession::open(storage, "invoice-4").await?;
    assert_eq!(reopened.store().len(), 1);
    assert_eq!(reopened.current(), &invoice("INV-3"));

    Ok(())
}

#[tokio::test]
async fn test_line_item_edits_round_trip_through_storage() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path(), "rae");

    let mut session = EditorSession::open(storage, "invoice-5").await?;
    let mut doc = invoice("INV-1");
    doc.add_item("items", "Widget", 2.0, 5.0).unwrap();
    doc.add_item("items", "Gadget", 1.0, 3.0).unwrap();
    session.update_working(doc);

    // The whole item list reports as one opaque change.
    assert_eq!(session.change_set().paths(), ["items", "number", "seller.name"]);

    session.save(SaveKind::Draft).await?;

    let storage = JsonFileStorage::new(dir.path(), "rae");
    let reopened = EditorSession::open(storage, "invoice-5").await?;
    let items = reopened.current().items("items").unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].total, 10.0);

    Ok(())
}

#[tokio::test]
async fn test_switch_to_missing_version_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path(), "rae");

    let mut session = EditorSession::open(storage, "invoice-6").await?;
    session.update_working(invoice("INV-1"));
    session.save(SaveKind::Final).await?;

    assert!(session.request_switch(&VersionId::new("missing")).is_err());
    Ok(())
}
