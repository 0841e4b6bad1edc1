//! vatomic - versioned atomic persistence for document stores
//!
//! vatomic attaches a version counter to every document and writes through
//! single compare-and-swap requests instead of unconditional saves. Losing
//! a race is reported as data, never as an error, so callers decide whether
//! to re-read and retry.
//!
//! # Quick Start
//!
//! ```ignore
//! use vatomic::{InMemoryStore, VersionedAtomic, VersionedCollection};
//!
//! let coll = VersionedCollection::new(InMemoryStore::new());
//!
//! let mut user = User::new("ann", "ann@example.com");
//! user.versioned_create(&coll, None)?;
//! assert_eq!(user.version(), 1);
//!
//! user.email = "ann@example.org".into();
//! let write = user.versioned_update(&coll, &["email"], false, None)?;
//! if !write.success() {
//!     // someone else moved the document on: reload and try again
//! }
//! ```
//!
//! # Architecture
//!
//! - `vatomic-core`: document model, request and outcome types, the
//!   [`VersionedEntity`] capability and the [`DocumentStore`] contract
//! - `vatomic-storage`: [`InMemoryStore`], an atomic in-process store
//! - `vatomic-engine`: request building, execution, reconciliation and the
//!   [`VersionedAtomic`] operations

pub use vatomic_core::*;
pub use vatomic_engine::*;
pub use vatomic_storage::InMemoryStore;
