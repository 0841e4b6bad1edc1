//! Core types and traits for vatomic
//!
//! This crate defines the foundational types used throughout the system:
//! - DocId, Document: raw document model and reserved field names
//! - Filter, UpdateSpec, WriteOptions, WriteRequest: the CAS request triple
//! - WriteOutcome, UpdateResult, CasOutcome: normalized store responses
//! - VersionState, FieldRegistry, VersionedEntity: the versioning capability
//! - Halt: control-flow signal for post-write hook chains
//! - DocumentStore: the store collaborator contract
//! - VAtomicError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod entity;
pub mod error;
pub mod halt;
pub mod outcome;
pub mod request;
pub mod traits;

pub use document::{
    is_reserved, DocId, Document, ID_FIELD, OP_SUCCESS_FIELD, RESERVED_FIELDS, VERSION_FIELD,
};
pub use entity::{
    decode, FieldAccessor, FieldGetter, FieldRegistry, FieldRegistryBuilder, FieldSetter,
    VersionState, VersionedEntity,
};
pub use error::{VAtomicError, VAtomicResult};
pub use halt::{Halt, HaltReason, HookResult};
pub use outcome::{CasOutcome, CasStatus, OutcomeForm, UpdateResult, VersionedWrite, WriteOutcome};
pub use request::{Filter, UpdateSpec, WriteOptions, WriteRequest};
pub use traits::DocumentStore;
