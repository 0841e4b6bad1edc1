//! Raw document types
//!
//! - DocId: opaque identifier, immutable once assigned
//! - Document: mapping of field name to JSON value, as the store sees it
//!
//! Field names may be dotted paths (`entries.abc`) when addressing nested
//! objects in filters and update sections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Field holding the document id
pub const ID_FIELD: &str = "_id";

/// Field holding the CAS version counter
pub const VERSION_FIELD: &str = "version";

/// Transient per-call success marker; never persisted by the CAS path
pub const OP_SUCCESS_FIELD: &str = "op_success";

/// Fields owned by the versioning capability rather than the entity
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, VERSION_FIELD, OP_SUCCESS_FIELD];

/// True if `name` is one of [`RESERVED_FIELDS`]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Opaque document identifier
///
/// Generated ids are UUID v4 strings, but any string the store accepts is a
/// valid id. An entity's id never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        DocId(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing id
    pub fn from_string(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id out of a JSON value
    ///
    /// Only strings are accepted; numbers and objects are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(DocId::from_string)
    }

    /// The id as a JSON value
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId::from_string(s)
    }
}

/// A raw document: field name -> JSON value
///
/// Newtype around `serde_json::Map` with direct access via Deref/DerefMut.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// Build a document from a JSON object
    ///
    /// Returns `None` if `value` is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Document(map)),
            _ => None,
        }
    }

    /// Convert into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Unwrap the underlying map
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// The document id, if present and a string
    pub fn id(&self) -> Option<DocId> {
        self.0.get(ID_FIELD).and_then(DocId::from_value)
    }

    /// The stored version counter, if present
    pub fn version(&self) -> Option<u64> {
        self.0.get(VERSION_FIELD).and_then(Value::as_u64)
    }

    /// Read a possibly dotted path
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Write a possibly dotted path, creating intermediate objects
    ///
    /// Returns `false` if an intermediate segment exists and is not an
    /// object; the document is left unchanged in that case.
    pub fn set_path(&mut self, path: &str, value: Value) -> bool {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return false,
        };

        let mut current = &mut self.0;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => return false,
            };
        }
        current.insert(last.to_string(), value);
        true
    }

    /// Copy of this document without `version` and `op_success`
    ///
    /// Used by the unconditional save path so it can never move the CAS
    /// counter.
    pub fn without_versioning_fields(&self) -> Document {
        let mut doc = self.clone();
        doc.0.remove(VERSION_FIELD);
        doc.0.remove(OP_SUCCESS_FIELD);
        doc
    }
}

impl Deref for Document {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
