//! Halt Guard
//!
//! Post-write hooks only run when the write took effect. The guard turns a
//! failed outcome into a [`Halt`] before the chain starts, hooks may raise
//! their own, and [`settle`] consumes whatever came out at the operation
//! boundary so the signal never reaches the caller.

use tracing::debug;
use vatomic_core::{CasOutcome, DocumentStore, Halt, HaltReason, HookResult, VersionedEntity};

/// Stop the after-create chain unless a document was inserted
pub fn guard_create(outcome: &CasOutcome) -> HookResult {
    if outcome.success() {
        Ok(())
    } else {
        Err(Halt::new(HaltReason::NothingInserted))
    }
}

/// Stop the after-update chain unless the document was modified
pub fn guard_update(outcome: &CasOutcome) -> HookResult {
    if outcome.success() {
        Ok(())
    } else {
        Err(Halt::new(HaltReason::NotModified))
    }
}

/// Guard, then run the entity's after-create hooks
pub fn run_after_create<E: VersionedEntity>(
    entity: &mut E,
    store: &dyn DocumentStore,
    outcome: &CasOutcome,
) -> HookResult {
    guard_create(outcome)?;
    entity.after_create(store, outcome)
}

/// Guard, then run the entity's after-update hooks
pub fn run_after_update<E: VersionedEntity>(
    entity: &mut E,
    store: &dyn DocumentStore,
    outcome: &CasOutcome,
) -> HookResult {
    guard_update(outcome)?;
    entity.after_update(store, outcome)
}

/// Consume the chain's result
///
/// Returns true if every hook ran.
pub fn settle(result: HookResult) -> bool {
    match result {
        Ok(()) => true,
        Err(halt) => {
            debug!(target: "vatomic::cas", reason = %halt.reason, "after hooks skipped");
            false
        }
    }
}
