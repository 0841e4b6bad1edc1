//! CAS request types
//!
//! A versioned write is always expressed as a `(filter, update, options)`
//! triple handed to the store's single atomic primitive:
//!
//! - [`Filter`]: the CAS precondition (`_id`, plus `version` unless bypassed)
//! - [`UpdateSpec`]: `$setOnInsert` / `$set` / `$inc` sections
//! - [`WriteOptions`]: `upsert` and `return_after`

use crate::document::{DocId, Document, ID_FIELD, VERSION_FIELD};
use crate::error::{VAtomicError, VAtomicResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// CAS precondition: top-level field equality
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Document);

impl Filter {
    /// Empty filter (matches every document)
    pub fn new() -> Self {
        Filter(Document::new())
    }

    /// Filter on the document id
    pub fn by_id(id: &DocId) -> Self {
        Filter(Document::new().with(ID_FIELD, id.to_value()))
    }

    /// Add the expected version
    pub fn with_version(mut self, version: u64) -> Self {
        self.0.insert(VERSION_FIELD.to_string(), Value::from(version));
        self
    }

    /// Add an arbitrary equality condition
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Expected version, if this filter carries one
    pub fn expected_version(&self) -> Option<u64> {
        self.0.version()
    }

    /// Borrow the underlying document
    pub fn as_document(&self) -> &Document {
        &self.0
    }
}

impl Deref for Filter {
    type Target = Document;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Filter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Document> for Filter {
    fn from(doc: Document) -> Self {
        Filter(doc)
    }
}

/// Update specification
///
/// Serializes with the store's operator names so a caller-supplied override
/// can be written as `{"$set": {...}, "$inc": {...}}`. Unknown operators are
/// rejected on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSpec {
    /// Applied only when the operation inserts a new document
    #[serde(rename = "$setOnInsert", default, skip_serializing_if = "Option::is_none")]
    pub set_on_insert: Option<Document>,

    /// Field assignments applied to the matched (or inserted) document
    #[serde(rename = "$set", default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Document>,

    /// Integer deltas
    #[serde(rename = "$inc", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inc: BTreeMap<String, i64>,
}

impl UpdateSpec {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an update from its JSON form
    pub fn from_value(value: Value) -> VAtomicResult<Self> {
        if !value.is_object() {
            return Err(VAtomicError::invalid_update(
                "update must be a JSON object of operators",
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Update with a `$setOnInsert` section
    pub fn set_on_insert(doc: Document) -> Self {
        UpdateSpec {
            set_on_insert: Some(doc),
            ..Self::default()
        }
    }

    /// Update with a `$set` section
    pub fn set(doc: Document) -> Self {
        UpdateSpec {
            set: Some(doc),
            ..Self::default()
        }
    }

    /// Builder-style `$set` entry
    pub fn with_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set
            .get_or_insert_with(Document::new)
            .insert(field.into(), value.into());
        self
    }

    /// Builder-style `$inc` entry
    pub fn with_inc(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.inc.insert(field.into(), delta);
        self
    }

    /// Add `version: +1` to `$inc`, keeping any other counters
    pub fn increment_version(&mut self) {
        self.inc.insert(VERSION_FIELD.to_string(), 1);
    }

    /// True if `$inc` carries the version increment
    pub fn increments_version(&self) -> bool {
        self.inc.contains_key(VERSION_FIELD)
    }

    /// True if no section carries anything
    pub fn is_empty(&self) -> bool {
        self.set_on_insert.as_ref().map_or(true, |d| d.is_empty())
            && self.set.as_ref().map_or(true, |d| d.is_empty())
            && self.inc.is_empty()
    }
}

/// Options for the atomic primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Insert a new document when the filter matches nothing
    pub upsert: bool,
    /// Return the post-write document rather than the pre-write one
    pub return_after: bool,
}

impl WriteOptions {
    /// Options for a create CAS
    pub const fn create() -> Self {
        WriteOptions {
            upsert: true,
            return_after: true,
        }
    }

    /// Options for an update CAS
    pub const fn update() -> Self {
        WriteOptions {
            upsert: false,
            return_after: true,
        }
    }
}

/// A complete CAS request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Precondition
    pub filter: Filter,
    /// Update sections
    pub update: UpdateSpec,
    /// Primitive options
    pub options: WriteOptions,
}

impl WriteRequest {
    /// Assemble a request
    pub fn new(filter: Filter, update: UpdateSpec, options: WriteOptions) -> Self {
        WriteRequest {
            filter,
            update,
            options,
        }
    }
}
