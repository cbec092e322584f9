//! Structural diff between two document snapshots.
//!
//! `diff` walks both documents and reports every leaf field whose value
//! differs, each entry carrying the typed path plus the old and new values.
//! Item lists (and any other arrays) are compared as whole blobs at their
//! containing key: a reorder or a single-cell edit yields exactly one entry
//! for that key. Missing keys, `null`, and empty nested documents are all
//! equivalent to "no value", shown as the `"empty"` sentinel.

use crate::document::{Document, Field, FieldPath};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Sentinel rendered for a missing or null side of a change.
const EMPTY: &str = "empty";

/// One changed leaf field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field_path: FieldPath,
    pub old_value: Value,
    pub new_value: Value,
}

/// An ordered set of changed fields, as produced by [`diff`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<FieldChange>);

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.0.iter()
    }

    /// Dot-joined paths of every change, in order.
    pub fn paths(&self) -> Vec<String> {
        self.0.iter().map(|c| c.field_path.to_string()).collect()
    }

    /// Whether anything at or under `path` changed, or a change at an
    /// ancestor of `path` covers it (an opaque item-list entry covers every
    /// cell inside the list).
    pub fn touches(&self, path: &FieldPath) -> bool {
        self.0
            .iter()
            .any(|c| path.contains(&c.field_path) || c.field_path.contains(path))
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compute the set of changed fields between two snapshots.
///
/// Pure: the result is empty if and only if the two documents are
/// value-equal under the rules above.
pub fn diff(old: &Document, new: &Document) -> ChangeSet {
    let mut changes = Vec::new();
    let mut path: Vec<String> = Vec::new();
    diff_documents(old, new, &mut path, &mut changes);
    ChangeSet(changes)
}

fn diff_documents(
    old: &Document,
    new: &Document,
    path: &mut Vec<String>,
    changes: &mut Vec<FieldChange>,
) {
    // Union of both key sets so removed fields are reported too.
    let keys: BTreeSet<&String> = old
        .fields()
        .map(|(k, _)| k)
        .chain(new.fields().map(|(k, _)| k))
        .collect();

    for key in keys {
        path.push(key.clone());
        diff_field(old.field(key), new.field(key), path, changes);
        path.pop();
    }
}

fn diff_field(
    old: Option<&Field>,
    new: Option<&Field>,
    path: &mut Vec<String>,
    changes: &mut Vec<FieldChange>,
) {
    let old_value = canonical(old);
    let new_value = canonical(new);
    if old_value == new_value {
        return;
    }

    match (old, new) {
        // Two nested documents: recurse so each leaf reports its own change.
        (Some(Field::Nested(old_doc)), Some(Field::Nested(new_doc))) => {
            diff_documents(old_doc, new_doc, path, changes);
        }
        // New nested document where nothing (or null) was before: recurse
        // against an empty document so each new leaf reports "empty" as its
        // old value.
        (_, Some(Field::Nested(new_doc))) if old_value.is_null() => {
            diff_documents(&Document::new(), new_doc, path, changes);
        }
        // Everything else (scalars, item lists, shape changes) is compared
        // as a whole value at this key.
        _ => changes.push(FieldChange {
            field_path: FieldPath::from_segments(path.iter().cloned()),
            old_value: display(old_value),
            new_value: display(new_value),
        }),
    }
}

/// Canonical comparison value for a field: missing is null, nested documents
/// drop their null-valued keys, and an empty nested document collapses to
/// null. Item lists and plain arrays stay opaque.
fn canonical(field: Option<&Field>) -> Value {
    match field {
        None => Value::Null,
        Some(Field::Scalar(value)) => value.clone(),
        Some(Field::Items(items)) => serde_json::to_value(items).unwrap_or(Value::Null),
        Some(Field::Nested(doc)) => {
            let mut map = serde_json::Map::new();
            for (key, child) in doc.fields() {
                let value = canonical(Some(child));
                if !value.is_null() {
                    map.insert(key.clone(), value);
                }
            }
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
    }
}

fn display(value: Value) -> Value {
    if value.is_null() {
        Value::String(EMPTY.into())
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_identical_documents_produce_no_changes() {
        let d = doc(json!({
            "number": "INV-1",
            "seller": { "name": "Acme", "address": { "city": "Berlin" } },
            "items": [
                { "id": 1, "name": "Widget", "quantity": 2.0, "price": 5.0, "total": 10.0 }
            ],
        }));
        assert!(diff(&d, &d).is_empty());
    }

    #[test]
    fn test_single_leaf_change_yields_one_entry() {
        let old = doc(json!({ "number": "INV-1", "items": [] }));
        let new = doc(json!({ "number": "INV-2", "items": [] }));

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        let change = &changes.changes()[0];
        assert_eq!(change.field_path.to_string(), "number");
        assert_eq!(change.old_value, json!("INV-1"));
        assert_eq!(change.new_value, json!("INV-2"));
    }

    #[test]
    fn test_nested_change_reports_full_path() {
        let old = doc(json!({ "seller": { "address": { "city": "Berlin" } } }));
        let new = doc(json!({ "seller": { "address": { "city": "Hamburg" } } }));

        let changes = diff(&old, &new);
        assert_eq!(changes.paths(), ["seller.address.city"]);
    }

    #[test]
    fn test_missing_null_and_empty_object_are_equivalent() {
        let a = doc(json!({ "notes": null }));
        let b = doc(json!({}));
        let c = doc(json!({ "notes": {} }));

        assert!(diff(&a, &b).is_empty());
        assert!(diff(&b, &c).is_empty());
        assert!(diff(&a, &c).is_empty());
    }

    #[test]
    fn test_item_list_mutation_is_one_opaque_change() {
        let old = doc(json!({
            "items": [
                { "id": 1, "name": "Widget", "quantity": 2.0, "price": 5.0, "total": 10.0 },
                { "id": 2, "name": "Gadget", "quantity": 1.0, "price": 3.0, "total": 3.0 }
            ],
        }));
        // Reordered and one quantity edited: still a single entry.
        let new = doc(json!({
            "items": [
                { "id": 2, "name": "Gadget", "quantity": 4.0, "price": 3.0, "total": 12.0 },
                { "id": 1, "name": "Widget", "quantity": 2.0, "price": 5.0, "total": 10.0 }
            ],
        }));

        let changes = diff(&old, &new);
        assert_eq!(changes.paths(), ["items"]);
    }

    #[test]
    fn test_removed_field_reports_empty_new_value() {
        let old = doc(json!({ "number": "INV-1", "reference": "PO-7" }));
        let new = doc(json!({ "number": "INV-1" }));

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        let change = &changes.changes()[0];
        assert_eq!(change.field_path.to_string(), "reference");
        assert_eq!(change.old_value, json!("PO-7"));
        assert_eq!(change.new_value, json!("empty"));
    }

    #[test]
    fn test_new_nested_subtree_reports_per_leaf_changes() {
        let old = doc(json!({}));
        let new = doc(json!({ "seller": { "name": "Acme", "vat": "DE123" } }));

        let changes = diff(&old, &new);
        assert_eq!(changes.paths(), ["seller.name", "seller.vat"]);
        assert!(changes.iter().all(|c| c.old_value == json!("empty")));
    }

    #[test]
    fn test_scalar_replaced_by_subtree_is_one_change() {
        let old = doc(json!({ "seller": "Acme" }));
        let new = doc(json!({ "seller": { "name": "Acme" } }));

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].old_value, json!("Acme"));
        assert_eq!(changes.changes()[0].new_value, json!({ "name": "Acme" }));
    }

    #[test]
    fn test_touches_matches_ancestors_and_descendants() {
        let old = doc(json!({ "seller": { "address": { "city": "Berlin" } }, "items": [] }));
        let new = doc(json!({ "seller": { "address": { "city": "Hamburg" } }, "items": [] }));
        let changes = diff(&old, &new);

        assert!(changes.touches(&"seller".parse().unwrap()));
        assert!(changes.touches(&"seller.address.city".parse().unwrap()));
        assert!(changes.touches(&"seller.address.city.zip".parse().unwrap()));
        assert!(!changes.touches(&"items".parse().unwrap()));
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let old = doc(json!({ "number": "INV-1" }));
        let new = doc(json!({ "number": "INV-2" }));

        let json = serde_json::to_value(diff(&old, &new)).unwrap();
        assert_eq!(
            json,
            json!([{ "fieldPath": "number", "oldValue": "INV-1", "newValue": "INV-2" }])
        );
    }
}
