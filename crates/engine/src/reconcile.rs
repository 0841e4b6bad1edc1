//! Reconciler
//!
//! Decides whether a write took effect and merges the persisted result back
//! into the entity. On failure only the outcome markers change; the caller
//! records those from the returned verdict.

use vatomic_core::{
    Document, OutcomeForm, VAtomicResult, VersionedEntity, WriteOutcome, ID_FIELD,
    OP_SUCCESS_FIELD, VERSION_FIELD,
};

use crate::builder::UpdatePlan;

/// Target version of a successful create
pub const CREATED_VERSION: u64 = 1;

/// Reconcile a create
///
/// Counts form: success iff the store inserted a document. A match on an
/// existing document is not a create; its fields were left alone.
/// Returned-document form: success iff the returned version is 1.
///
/// # Errors
///
/// Returns a mapping error if a returned field cannot be applied.
pub fn reconcile_create<E: VersionedEntity>(
    outcome: &WriteOutcome,
    entity: &mut E,
) -> VAtomicResult<bool> {
    let success = match outcome.form {
        OutcomeForm::WriteCounts => outcome.inserted(),
        OutcomeForm::ReturnedDocument => outcome.returned_version() == Some(CREATED_VERSION),
    };
    if !success {
        return Ok(false);
    }

    entity.version_state_mut().version = CREATED_VERSION;
    if let Some(doc) = &outcome.document {
        apply_persisted(doc, entity)?;
    }
    Ok(true)
}

/// Reconcile an update
///
/// Counts form: success iff exactly one document was modified.
/// Returned-document form: success iff a document came back carrying the
/// expected version (any document, when versioning was bypassed).
///
/// # Errors
///
/// Returns a mapping error if a returned field cannot be applied.
pub fn reconcile_update<E: VersionedEntity>(
    outcome: &WriteOutcome,
    plan: &UpdatePlan,
    entity: &mut E,
) -> VAtomicResult<bool> {
    let success = match outcome.form {
        OutcomeForm::WriteCounts => outcome.modified_count == Some(1),
        OutcomeForm::ReturnedDocument => match outcome.returned_version() {
            _ if outcome.document.is_none() => false,
            _ if plan.bypass_versioning => true,
            version => version == Some(plan.expected_version),
        },
    };
    if !success {
        return Ok(false);
    }

    match &outcome.document {
        Some(doc) => apply_persisted(doc, entity)?,
        None if !plan.bypass_versioning => {
            entity.version_state_mut().version = plan.expected_version;
        }
        None => {}
    }
    Ok(true)
}

/// Copy a persisted document onto the entity
///
/// `version` is always taken verbatim. Other fields are written only when
/// they differ from the entity's current value. `_id`, `op_success` and
/// fields the entity does not know are ignored.
///
/// # Errors
///
/// Returns a mapping error if a value does not fit its field.
pub fn apply_persisted<E: VersionedEntity>(doc: &Document, entity: &mut E) -> VAtomicResult<()> {
    for (name, value) in doc.iter() {
        match name.as_str() {
            VERSION_FIELD => {
                if let Some(version) = value.as_u64() {
                    entity.version_state_mut().version = version;
                }
            }
            ID_FIELD | OP_SUCCESS_FIELD => {}
            _ => {
                if entity.get_field(name).as_ref() != Some(value) {
                    entity.set_field(name, value.clone())?;
                }
            }
        }
    }
    Ok(())
}
