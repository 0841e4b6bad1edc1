//! Versioned atomic engine for vatomic
//!
//! This crate turns entity state into single atomic CAS requests and folds
//! the store's answer back into the entity:
//! - Request Builder: (filter, update, options) per operation
//! - Persistence Executor: one store primitive per call, normalized outcome
//! - Reconciler: success verdict and field merge
//! - Halt Guard: stops after-write hooks when a write had no effect
//! - VersionedCollection: explicit store handle plus `vatomic.toml` config
//!
//! The engine never retries. A caller that loses a race re-reads the
//! document and calls again.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod collection;
pub mod config;
pub mod executor;
pub mod guard;
pub mod reconcile;
pub mod versioned;


pub use builder::{
    build_create_request, build_update_request, build_upsert_one_request, UpdatePlan,
};
pub use collection::VersionedCollection;
pub use config::{SuccessCheck, VAtomicConfig, CONFIG_FILE_NAME};
pub use executor::{Executor, OpKind, Primitive};
pub use versioned::{
    save_unversioned, versioned_create, versioned_update, versioned_upsert_one, VersionedAtomic,
};
