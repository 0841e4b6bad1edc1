//! Persistence Executor
//!
//! Issues exactly one atomic primitive per call and normalizes the answer
//! into a [`WriteOutcome`]. Store failures propagate unchanged.

use std::fmt;

use tracing::{debug, info, warn};
use vatomic_core::{DocId, DocumentStore, Filter, VAtomicResult, WriteOutcome, WriteRequest};

/// The store primitive a request is sent through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// `find_and_modify`: answers with a document
    FindAndModify,
    /// `update_one`: answers with write counts
    UpdateOne,
}

/// Which versioned operation is issuing a request (for logs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `versioned_create`
    Create,
    /// `versioned_update`
    Update,
    /// `versioned_upsert_one`
    UpsertOne,
    /// the unconditional save path
    Save,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Create => write!(f, "create"),
            OpKind::Update => write!(f, "update"),
            OpKind::UpsertOne => write!(f, "upsert_one"),
            OpKind::Save => write!(f, "save"),
        }
    }
}

/// Sends CAS requests to a store
pub struct Executor<'a> {
    store: &'a dyn DocumentStore,
    log_requests: bool,
}

impl<'a> Executor<'a> {
    /// Executor over `store`
    pub fn new(store: &'a dyn DocumentStore, log_requests: bool) -> Self {
        Executor {
            store,
            log_requests,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    /// Issue `request` through `primitive`
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub fn execute(
        &self,
        op: OpKind,
        request: &WriteRequest,
        primitive: Primitive,
    ) -> VAtomicResult<WriteOutcome> {
        self.log_request(op, request);

        let result = match primitive {
            Primitive::FindAndModify => self
                .store
                .find_and_modify(&request.filter, &request.update, request.options)
                .map(WriteOutcome::from_document),
            Primitive::UpdateOne => self
                .store
                .update_one(&request.filter, &request.update, request.options)
                .map(WriteOutcome::from_counts),
        };

        match &result {
            Ok(outcome) => debug!(
                target: "vatomic::cas",
                op = %op,
                matched = ?outcome.matched_count,
                modified = ?outcome.modified_count,
                upserted = ?outcome.upserted_id,
                returned_version = ?outcome.returned_version(),
                "store answered"
            ),
            Err(e) => warn!(target: "vatomic::cas", op = %op, error = %e, "store request failed"),
        }
        result
    }

    /// Attach the current stored document to a counts-form outcome
    ///
    /// Used after an `update_one` so the entity can be refreshed. The read is
    /// not part of the CAS: a concurrent writer may have moved the document
    /// on since.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub fn refetch(&self, id: &DocId, mut outcome: WriteOutcome) -> VAtomicResult<WriteOutcome> {
        outcome.document = self.store.find_one(&Filter::by_id(id))?;
        Ok(outcome)
    }

    fn log_request(&self, op: OpKind, request: &WriteRequest) {
        debug!(
            target: "vatomic::cas",
            op = %op,
            filter = ?request.filter,
            update = ?request.update,
            upsert = request.options.upsert,
            return_after = request.options.return_after,
            "issuing CAS request"
        );
        if self.log_requests {
            match serde_json::to_string_pretty(request) {
                Ok(pretty) => info!(target: "vatomic::cas", op = %op, "request:\n{}", pretty),
                Err(e) => warn!(target: "vatomic::cas", error = %e, "could not render request"),
            }
        }
    }
}
