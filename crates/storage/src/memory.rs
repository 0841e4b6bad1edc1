//! InMemoryStore: reference document store with BTreeMap and RwLock
//!
//! This module implements the DocumentStore trait using:
//! - `BTreeMap<DocId, Document>` ordered by id
//! - `parking_lot::RwLock` for thread-safe access
//!
//! # Design Notes
//!
//! - **Atomic CAS**: `find_and_modify` and `update_one` evaluate the filter and
//!   apply the update under one write lock, so two requests carrying the same
//!   precondition can never both match.
//! - **Scratch-copy updates**: an update that fails to apply leaves the
//!   stored document untouched.
//! - **Duplicate ids**: an upsert whose filter missed but whose `_id` is
//!   already taken fails, as a unique index on `_id` would.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use vatomic_core::{
    DocId, Document, DocumentStore, Filter, UpdateResult, UpdateSpec, VAtomicError, VAtomicResult,
    WriteOptions, ID_FIELD,
};

use crate::apply::{apply_update, check_conflicts, matches, seed_from_filter};

/// What a single atomic write did
#[derive(Debug)]
enum Applied {
    Updated { before: Document, after: Document },
    Inserted { id: DocId, after: Document },
    Missed,
}

/// In-memory document store
///
/// Cloning shares the underlying collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    docs: Arc<RwLock<BTreeMap<DocId, Document>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document unconditionally (test setup)
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no string `_id` or the id is
    /// already taken.
    pub fn insert(&self, doc: Document) -> VAtomicResult<DocId> {
        let id = doc
            .id()
            .ok_or_else(|| VAtomicError::store("document has no string '_id'"))?;
        let mut docs = self.docs.write();
        if docs.contains_key(&id) {
            return Err(VAtomicError::store(format!("duplicate key: _id {}", id)));
        }
        docs.insert(id.clone(), doc);
        Ok(id)
    }

    /// Read a document by id
    pub fn get(&self, id: &DocId) -> Option<Document> {
        self.docs.read().get(id).cloned()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// True if the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Snapshot of every document, ordered by id
    pub fn all(&self) -> Vec<Document> {
        self.docs.read().values().cloned().collect()
    }

    /// Remove every document
    pub fn clear(&self) {
        self.docs.write().clear();
    }

    /// The single atomic step behind both write primitives
    fn apply_one(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
        options: WriteOptions,
    ) -> VAtomicResult<Applied> {
        check_conflicts(update)?;

        let mut docs = self.docs.write();

        let target = docs
            .iter()
            .find(|(_, doc)| matches(filter, doc))
            .map(|(id, _)| id.clone());

        if let Some(id) = target {
            let before = docs
                .get(&id)
                .cloned()
                .ok_or_else(|| VAtomicError::store("matched document vanished"))?;
            let after = apply_update(&before, update, false)?;
            docs.insert(id, after.clone());
            return Ok(Applied::Updated { before, after });
        }

        if !options.upsert {
            return Ok(Applied::Missed);
        }

        let seeded = seed_from_filter(filter)?;
        let mut after = apply_update(&seeded, update, true)?;
        let id = match after.id() {
            Some(id) => id,
            None => {
                let id = DocId::new();
                after.insert(ID_FIELD.to_string(), id.to_value());
                id
            }
        };
        if docs.contains_key(&id) {
            return Err(VAtomicError::store(format!("duplicate key: _id {}", id)));
        }
        trace!(target: "vatomic::store", id = %id, "upsert inserted document");
        docs.insert(id.clone(), after.clone());
        Ok(Applied::Inserted { id, after })
    }
}

impl DocumentStore for InMemoryStore {
    fn find_and_modify(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
        options: WriteOptions,
    ) -> VAtomicResult<Option<Document>> {
        Ok(match self.apply_one(filter, update, options)? {
            Applied::Updated { before, after } => Some(if options.return_after {
                after
            } else {
                before
            }),
            Applied::Inserted { after, .. } => options.return_after.then_some(after),
            Applied::Missed => None,
        })
    }

    fn update_one(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
        options: WriteOptions,
    ) -> VAtomicResult<UpdateResult> {
        Ok(match self.apply_one(filter, update, options)? {
            Applied::Updated { before, after } => UpdateResult {
                matched_count: 1,
                modified_count: u64::from(before != after),
                upserted_id: None,
            },
            Applied::Inserted { id, .. } => UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            },
            Applied::Missed => UpdateResult::default(),
        })
    }

    fn find_one(&self, filter: &Filter) -> VAtomicResult<Option<Document>> {
        let docs = self.docs.read();
        Ok(docs.values().find(|doc| matches(filter, doc)).cloned())
    }

    fn count(&self, filter: &Filter) -> VAtomicResult<u64> {
        let docs = self.docs.read();
        Ok(docs.values().filter(|doc| matches(filter, doc)).count() as u64)
    }
}
