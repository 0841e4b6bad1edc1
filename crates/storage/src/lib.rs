//! Storage layer for vatomic
//!
//! This crate implements the document store collaborator:
//! - InMemoryStore: BTreeMap-based collection behind a RwLock, with atomic
//!   `find_and_modify` / `update_one`
//! - apply: filter matching and `$setOnInsert` / `$set` / `$inc` application
//!
//! Production deployments implement [`vatomic_core::DocumentStore`] over their
//! own driver; this store backs tests and embedded use.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod memory;

pub use memory::InMemoryStore;
