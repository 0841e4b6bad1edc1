//! Write outcomes
//!
//! The store answers a CAS request in one of two shapes: the post-write
//! document, or write statistics. [`WriteOutcome`] normalizes both and leaves
//! whatever the primitive did not report as `None` (never zero).
//!
//! [`CasOutcome`] is what an operation hands back to its caller: conflicts
//! and no-op writes are data here, not errors.

use crate::document::{DocId, Document};
use crate::request::WriteRequest;
use serde::{Deserialize, Serialize};

/// Raw response of the store's `update_one`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Documents matched by the filter
    pub matched_count: u64,
    /// Documents actually changed
    pub modified_count: u64,
    /// Id of the inserted document, if the upsert inserted one
    pub upserted_id: Option<DocId>,
}

/// Which primitive produced a [`WriteOutcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeForm {
    /// `find_and_modify`
    ReturnedDocument,
    /// `update_one`
    WriteCounts,
}

/// Normalized result of one atomic request
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Shape of the underlying response
    pub form: OutcomeForm,
    /// Document handed back by the store, if any
    pub document: Option<Document>,
    /// Matched count, when reported
    pub matched_count: Option<u64>,
    /// Modified count, when reported
    pub modified_count: Option<u64>,
    /// Upserted id, when reported and an insert happened
    pub upserted_id: Option<DocId>,
}

impl WriteOutcome {
    /// Outcome of a `find_and_modify`
    pub fn from_document(document: Option<Document>) -> Self {
        WriteOutcome {
            form: OutcomeForm::ReturnedDocument,
            document,
            matched_count: None,
            modified_count: None,
            upserted_id: None,
        }
    }

    /// Outcome of an `update_one`
    pub fn from_counts(result: UpdateResult) -> Self {
        WriteOutcome {
            form: OutcomeForm::WriteCounts,
            document: None,
            matched_count: Some(result.matched_count),
            modified_count: Some(result.modified_count),
            upserted_id: result.upserted_id,
        }
    }

    /// True if the store inserted a new document
    pub fn inserted(&self) -> bool {
        self.upserted_id.is_some()
    }

    /// True if the request matched an existing document
    pub fn matched(&self) -> bool {
        self.matched_count.map_or(false, |n| n > 0)
    }

    /// Version carried by the returned document
    pub fn returned_version(&self) -> Option<u64> {
        self.document.as_ref().and_then(Document::version)
    }
}

/// How a versioned operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasStatus {
    /// The CAS matched and the write took effect
    Applied,
    /// The request touched nothing (version conflict or missing target)
    NoEffect,
    /// The entity's version ruled the operation out; nothing was sent
    PreconditionNotMet,
}

/// Caller-visible result of a versioned operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasOutcome {
    /// Final status
    pub status: CasStatus,
    /// Diagnostic matched count, when the store reported one
    pub matched_count: Option<u64>,
    /// Diagnostic modified count, when the store reported one
    pub modified_count: Option<u64>,
    /// Id of an inserted document
    pub upserted_id: Option<DocId>,
}

impl CasOutcome {
    /// Outcome for an operation that never reached the store
    pub fn precondition_not_met() -> Self {
        CasOutcome {
            status: CasStatus::PreconditionNotMet,
            matched_count: None,
            modified_count: None,
            upserted_id: None,
        }
    }

    /// Build from a write outcome and the reconciler's verdict
    pub fn from_write(outcome: &WriteOutcome, success: bool) -> Self {
        CasOutcome {
            status: if success {
                CasStatus::Applied
            } else {
                CasStatus::NoEffect
            },
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
            upserted_id: outcome.upserted_id.clone(),
        }
    }

    /// True if the write took effect
    pub fn success(&self) -> bool {
        self.status == CasStatus::Applied
    }
}

/// What `versioned_create` / `versioned_update` return
///
/// `request` is the triple that was (or would have been) sent; `None` when
/// the precondition ruled the call out before a request was built.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedWrite {
    /// The issued request
    pub request: Option<WriteRequest>,
    /// Outcome of the call
    pub outcome: CasOutcome,
}

impl VersionedWrite {
    /// Shorthand for `outcome.success()`
    pub fn success(&self) -> bool {
        self.outcome.success()
    }
}
