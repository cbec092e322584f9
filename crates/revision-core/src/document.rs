//! Document model for editable business documents (invoices, contracts).
//!
//! A document is an ordered mapping from field name to one of:
//! - a scalar value (string, number, bool, null, opaque array)
//! - a nested sub-document
//! - an ordered list of line items (invoice rows and the like)
//!
//! Field locations are addressed with `FieldPath`, a typed sequence of keys
//! that displays as the familiar dot-joined form (`"seller.address"`).
//! Lookups walk the typed segments, so a malformed path fails loudly instead
//! of creating a stray key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Empty field path")]
    Empty,

    #[error("Not a nested document at \"{0}\"")]
    NotNested(FieldPath),

    #[error("Not a line-item list at \"{0}\"")]
    NotItems(String),
}

pub type Result<T> = std::result::Result<T, PathError>;

/// A typed path from the document root to a field.
///
/// Displays as dot notation and parses back from it:
///
/// ```
/// use revision_core::FieldPath;
///
/// let path: FieldPath = "seller.address".parse().unwrap();
/// assert_eq!(path.to_string(), "seller.address");
/// assert_eq!(path.segments().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// A path with a single key.
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![key.into()])
    }

    /// Build a path from key segments.
    pub fn from_segments(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Extend this path by one key.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `self` equals `other` or is an ancestor of it.
    pub fn contains(&self, other: &FieldPath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() || s.split('.').any(str::is_empty) {
            return Err(PathError::Empty);
        }
        Ok(Self(s.split('.').map(String::from).collect()))
    }
}

// Serialize as the dot-joined string so change sets read naturally in JSON.
impl Serialize for FieldPath {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier for a line item, unique within its list for the lifetime of
/// the document. Assigned from the epoch-millisecond clock at creation and
/// bumped past the highest existing id on collision, so ids only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of an itemized list (an invoice line, a contract deliverable).
///
/// `total` is derived from `quantity * price`; use the mutators so it stays
/// consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub total: f64,
}

impl LineItem {
    pub fn new(id: ItemId, name: impl Into<String>, quantity: f64, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            price,
            total: quantity * price,
        }
    }

    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = quantity;
        self.recompute_total();
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        self.total = self.quantity * self.price;
    }
}

/// A single field of a document.
///
/// Untagged so snapshots round-trip to plain JSON: objects become nested
/// documents, arrays of line-item records become item lists, and everything
/// else stays a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Items(Vec<LineItem>),
    Nested(Document),
    Scalar(Value),
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let fields = map
                    .into_iter()
                    .map(|(k, v)| (k, Field::from(v)))
                    .collect();
                Field::Nested(Document { fields })
            }
            other => Field::Scalar(other),
        }
    }
}

/// A complete document snapshot: an ordered map of named fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, Field>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON value (must be an object).
    pub fn from_value(value: Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    /// Look up a top-level field by key.
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// Insert or replace a top-level field.
    pub fn insert(&mut self, key: impl Into<String>, field: Field) {
        self.fields.insert(key.into(), field);
    }

    /// Look up a field by typed path.
    pub fn get(&self, path: &FieldPath) -> Option<&Field> {
        let (last, parents) = path.segments().split_last()?;
        let mut doc = self;
        for key in parents {
            match doc.fields.get(key) {
                Some(Field::Nested(inner)) => doc = inner,
                _ => return None,
            }
        }
        doc.fields.get(last)
    }

    /// Set a field by typed path, creating nested documents along the way.
    ///
    /// Fails with `PathError::NotNested` if an intermediate key already holds
    /// a scalar or an item list.
    pub fn set(&mut self, path: &FieldPath, field: Field) -> Result<()> {
        let (last, parents) = path.segments().split_last().ok_or(PathError::Empty)?;
        let mut doc = self;
        let mut walked = FieldPath::default();
        for key in parents {
            walked = walked.child(key.clone());
            let entry = doc
                .fields
                .entry(key.clone())
                .or_insert_with(|| Field::Nested(Document::new()));
            match entry {
                Field::Nested(inner) => doc = inner,
                _ => return Err(PathError::NotNested(walked)),
            }
        }
        doc.fields.insert(last.clone(), field);
        Ok(())
    }

    /// Set a scalar (or, for JSON objects, a nested document) by typed path.
    pub fn set_value(&mut self, path: &FieldPath, value: impl Into<Value>) -> Result<()> {
        self.set(path, Field::from(value.into()))
    }

    /// Remove a field by typed path. Returns the removed field, or `None` if
    /// the path does not resolve.
    pub fn remove(&mut self, path: &FieldPath) -> Option<Field> {
        let (last, parents) = path.segments().split_last()?;
        let mut doc = self;
        for key in parents {
            match doc.fields.get_mut(key) {
                Some(Field::Nested(inner)) => doc = inner,
                _ => return None,
            }
        }
        doc.fields.remove(last)
    }

    /// The line items stored under `key`, if that field is an item list.
    pub fn items(&self, key: &str) -> Option<&[LineItem]> {
        match self.fields.get(key) {
            Some(Field::Items(items)) => Some(items),
            _ => None,
        }
    }

    /// Append a new line item under `key`, creating the list if absent.
    ///
    /// Allocates the next monotonic id and computes the derived total.
    pub fn add_item(
        &mut self,
        key: &str,
        name: impl Into<String>,
        quantity: f64,
        price: f64,
    ) -> Result<ItemId> {
        let entry = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| Field::Items(Vec::new()));
        let Field::Items(items) = entry else {
            return Err(PathError::NotItems(key.to_string()));
        };
        let id = next_item_id(items);
        items.push(LineItem::new(id, name, quantity, price));
        Ok(id)
    }

    /// Remove the line item with `id` from the list under `key`.
    pub fn remove_item(&mut self, key: &str, id: ItemId) -> Result<Option<LineItem>> {
        let Some(field) = self.fields.get_mut(key) else {
            return Ok(None);
        };
        let Field::Items(items) = field else {
            return Err(PathError::NotItems(key.to_string()));
        };
        let at = items.iter().position(|item| item.id == id);
        Ok(at.map(|at| items.remove(at)))
    }

    /// Mutate the line item with `id` under `key`. The derived total is
    /// recomputed afterwards. Returns false if no such item exists.
    pub fn update_item(
        &mut self,
        key: &str,
        id: ItemId,
        update: impl FnOnce(&mut LineItem),
    ) -> Result<bool> {
        let Some(field) = self.fields.get_mut(key) else {
            return Ok(false);
        };
        let Field::Items(items) = field else {
            return Err(PathError::NotItems(key.to_string()));
        };
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                update(item);
                item.recompute_total();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Next id for a list: the current clock, bumped past every existing id.
fn next_item_id(items: &[LineItem]) -> ItemId {
    let floor = items.iter().map(|item| item.id.0 + 1).max().unwrap_or(0);
    ItemId(now_millis().max(floor))
}

pub(crate) fn now_millis() -> u64 {
    use web_time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
