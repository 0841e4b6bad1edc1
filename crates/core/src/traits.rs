//! Store collaborator contract
//!
//! This module defines the `DocumentStore` trait that versioned operations
//! are written against. The engine never reaches a global collection: every
//! operation is handed a store explicitly, so tests can substitute fakes.

use crate::document::Document;
use crate::error::VAtomicResult;
use crate::outcome::UpdateResult;
use crate::request::{Filter, UpdateSpec, WriteOptions};

/// A single collection of documents with an atomic find-and-modify
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). `find_and_modify` and
/// `update_one` must each evaluate the filter and apply the update as one
/// atomic step: for a given precondition at most one concurrent request may
/// observe a match.
pub trait DocumentStore: Send + Sync {
    /// Atomically match one document and apply `update`
    ///
    /// Returns the post-write document when `options.return_after` is set,
    /// the pre-write document otherwise. Returns `None` if nothing matched
    /// and no upsert happened.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an inapplicable update.
    fn find_and_modify(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
        options: WriteOptions,
    ) -> VAtomicResult<Option<Document>>;

    /// Atomically match one document and apply `update`, reporting counts
    ///
    /// `options.return_after` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an inapplicable update.
    fn update_one(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
        options: WriteOptions,
    ) -> VAtomicResult<UpdateResult>;

    /// Read the first document matching `filter`
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn find_one(&self, filter: &Filter) -> VAtomicResult<Option<Document>>;

    /// Count documents matching `filter`
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn count(&self, filter: &Filter) -> VAtomicResult<u64>;
}
