//! Versioned atomic operations
//!
//! Every create/update runs the same pipeline:
//!
//! 1. reset the per-call markers
//! 2. check the version precondition (no request when it fails)
//! 3. validate (no request when it fails)
//! 4. before hook, build the request, issue it, reconcile
//! 5. record the outcome on the entity
//! 6. Halt Guard plus after hook, with any halt consumed here
//!
//! Version conflicts come back as [`CasStatus::NoEffect`]. Only store,
//! mapping and validation failures are errors. When a request was issued and
//! did not apply, or failed, the entity is restored to its state from before
//! the call (before-hook changes included); a non-applied outcome then
//! records its markers on the restored entity.
//!
//! A mapping error while merging the persisted document is the one case
//! where the store has already committed: the error is returned, the entity
//! keeps its old version and the caller must re-read before retrying.

use tracing::{debug, warn};
use vatomic_core::{
    CasOutcome, CasStatus, Filter, UpdateSpec, VAtomicError, VAtomicResult, VersionedEntity,
    VersionedWrite, WriteOptions, WriteOutcome, WriteRequest, ID_FIELD,
};

use crate::builder::{
    build_create_request, build_update_request, build_upsert_one_request, UpdatePlan,
};
use crate::collection::VersionedCollection;
use crate::config::SuccessCheck;
use crate::executor::{OpKind, Primitive};
use crate::guard::{run_after_create, run_after_update, settle};
use crate::reconcile::{reconcile_create, reconcile_update};

/// The versioned operations, available on every [`VersionedEntity`]
pub trait VersionedAtomic: VersionedEntity {
    /// Insert this entity with a single create CAS
    ///
    /// See [`versioned_create`].
    fn versioned_create(
        &mut self,
        collection: &VersionedCollection,
        filter: Option<Filter>,
    ) -> VAtomicResult<VersionedWrite> {
        versioned_create(self, collection, filter)
    }

    /// Persist this entity with a single update CAS
    ///
    /// See [`versioned_update`].
    fn versioned_update(
        &mut self,
        collection: &VersionedCollection,
        dirty_fields: &[&str],
        bypass_versioning: bool,
        override_update: Option<UpdateSpec>,
    ) -> VAtomicResult<VersionedWrite> {
        versioned_update(
            self,
            collection,
            dirty_fields,
            bypass_versioning,
            override_update,
        )
    }

    /// Upsert one document of this type
    ///
    /// See [`versioned_upsert_one`].
    fn versioned_upsert_one(
        collection: &VersionedCollection,
        filter: Filter,
        update: UpdateSpec,
        upsert: bool,
        bypass_versioning: bool,
    ) -> VAtomicResult<Option<Self>> {
        versioned_upsert_one(collection, filter, update, upsert, bypass_versioning)
    }

    /// Write this entity without touching its stored version
    ///
    /// See [`save_unversioned`].
    fn save_unversioned(&self, collection: &VersionedCollection) -> VAtomicResult<WriteOutcome> {
        save_unversioned(self, collection)
    }
}

impl<E: VersionedEntity> VersionedAtomic for E {}

/// Create `entity` in the store
///
/// Only legal at version 0. Succeeds iff the store inserted a new document;
/// a filter (or id) that already matches a stored document leaves that
/// document untouched and reports [`CasStatus::NoEffect`]. On success the
/// entity is at version 1 and `after_create` runs.
///
/// # Errors
///
/// Returns [`VAtomicError::Validation`] if the entity is invalid, or the
/// store's error. On a store error, as on [`CasStatus::NoEffect`], the
/// entity is left as it was apart from the outcome markers.
pub fn versioned_create<E: VersionedEntity>(
    entity: &mut E,
    collection: &VersionedCollection,
    filter: Option<Filter>,
) -> VAtomicResult<VersionedWrite> {
    let snapshot = entity.clone();
    entity.version_state_mut().begin_call();

    if entity.version() != 0 {
        return Ok(precondition_not_met(entity, OpKind::Create));
    }
    check_valid(entity, OpKind::Create)?;
    entity.before_create();

    let request = match build_create_request(entity, filter) {
        Some(request) => request,
        None => return Ok(precondition_not_met(entity, OpKind::Create)),
    };

    let outcome = match issue_create(entity, collection, &request) {
        Ok(outcome) => outcome,
        Err(e) => {
            *entity = snapshot;
            return Err(e);
        }
    };

    if !outcome.success() {
        *entity = snapshot;
    }
    finish(entity, OpKind::Create, &outcome);
    settle(run_after_create(entity, collection.store(), &outcome));
    Ok(VersionedWrite {
        request: Some(request),
        outcome,
    })
}

fn issue_create<E: VersionedEntity>(
    entity: &mut E,
    collection: &VersionedCollection,
    request: &WriteRequest,
) -> VAtomicResult<CasOutcome> {
    let write = collection
        .executor()
        .execute(OpKind::Create, request, Primitive::UpdateOne)?;
    let success = reconcile_create(&write, entity).map_err(|e| committed_unmapped(entity, e))?;
    Ok(CasOutcome::from_write(&write, success))
}

/// Update `entity` in the store
///
/// Only legal at version 1 or above. The request matches `{_id, version}`
/// (just `_id` when `bypass_versioning`) and bumps the stored version by
/// one. With an empty `dirty_fields` every field is written, otherwise only
/// the named ones, read from the entity. A non-empty `override_update`
/// replaces the computed sections.
///
/// How success is decided depends on the collection's `success_check`. On
/// success the entity takes the persisted document's values and
/// `after_update` runs; on a conflict only the outcome markers change, and
/// any change made by `before_update` is undone.
///
/// # Errors
///
/// Returns [`VAtomicError::Validation`] if the entity is invalid, a mapping
/// error for an unknown dirty field, [`VAtomicError::InvalidUpdate`] if
/// `override_update` names `_id`, `version` or `op_success`, or the store's
/// error. On any of these the entity is left as it was. A mapping error
/// raised while merging the persisted document means the write did commit;
/// re-read the document before retrying.
pub fn versioned_update<E: VersionedEntity>(
    entity: &mut E,
    collection: &VersionedCollection,
    dirty_fields: &[&str],
    bypass_versioning: bool,
    override_update: Option<UpdateSpec>,
) -> VAtomicResult<VersionedWrite> {
    let snapshot = entity.clone();
    entity.version_state_mut().begin_call();

    if entity.version() == 0 {
        return Ok(precondition_not_met(entity, OpKind::Update));
    }
    check_valid(entity, OpKind::Update)?;
    entity.before_update();

    let result = build_update_request(entity, dirty_fields, bypass_versioning, override_update)
        .and_then(|plan| match plan {
            Some(plan) => issue_update(entity, collection, &plan).map(|o| Some((plan, o))),
            None => Ok(None),
        });

    let (plan, outcome) = match result {
        Ok(Some(issued)) => issued,
        Ok(None) => return Ok(precondition_not_met(entity, OpKind::Update)),
        Err(e) => {
            *entity = snapshot;
            return Err(e);
        }
    };

    if !outcome.success() {
        *entity = snapshot;
    }
    finish(entity, OpKind::Update, &outcome);
    settle(run_after_update(entity, collection.store(), &outcome));
    Ok(VersionedWrite {
        request: Some(plan.request),
        outcome,
    })
}

fn issue_update<E: VersionedEntity>(
    entity: &mut E,
    collection: &VersionedCollection,
    plan: &UpdatePlan,
) -> VAtomicResult<CasOutcome> {
    if plan.request.update.is_empty() {
        debug!(target: "vatomic::cas", id = %entity.id(), "empty update, nothing sent");
        return Ok(CasOutcome {
            status: CasStatus::NoEffect,
            matched_count: None,
            modified_count: None,
            upserted_id: None,
        });
    }

    let executor = collection.executor();
    let write = match collection.config().success_check {
        SuccessCheck::ReturnedDocument => {
            executor.execute(OpKind::Update, &plan.request, Primitive::FindAndModify)?
        }
        SuccessCheck::WriteCounts => {
            let write = executor.execute(OpKind::Update, &plan.request, Primitive::UpdateOne)?;
            if write.modified_count == Some(1) {
                executor.refetch(entity.id(), write)?
            } else {
                write
            }
        }
    };
    let success =
        reconcile_update(&write, plan, entity).map_err(|e| committed_unmapped(entity, e))?;
    Ok(CasOutcome::from_write(&write, success))
}

fn committed_unmapped<E: VersionedEntity>(entity: &E, err: VAtomicError) -> VAtomicError {
    warn!(
        target: "vatomic::cas",
        id = %entity.id(),
        error = %err,
        "write committed but the persisted document did not map back, re-read before retrying"
    );
    err
}

/// Upsert one document and map the result to `E`
///
/// Not bound to a live entity. The version is bumped by one unless
/// `bypass_versioning`. An empty `filter` has no precondition at all, so
/// nothing is issued and `None` is returned; `None` is also returned when
/// the update is empty or nothing matched and no upsert happened.
///
/// # Errors
///
/// Returns [`VAtomicError::InvalidUpdate`] if `update` names `_id`,
/// `version` or `op_success`, the store's error, or a mapping error if the
/// document does not fit `E`.
pub fn versioned_upsert_one<E: VersionedEntity>(
    collection: &VersionedCollection,
    filter: Filter,
    update: UpdateSpec,
    upsert: bool,
    bypass_versioning: bool,
) -> VAtomicResult<Option<E>> {
    if filter.is_empty() {
        warn!(
            target: "vatomic::cas",
            "upsert_one with an empty filter: versioning bypassed, nothing sent"
        );
        return Ok(None);
    }

    let request = match build_upsert_one_request(filter, update, upsert, bypass_versioning)? {
        Some(request) => request,
        None => {
            debug!(target: "vatomic::cas", "empty upsert_one update, nothing sent");
            return Ok(None);
        }
    };

    let write = collection
        .executor()
        .execute(OpKind::UpsertOne, &request, Primitive::FindAndModify)?;
    E::from_document(write.document)
}

/// Unconditionally write `entity`'s fields by id
///
/// Inserts when the id is absent. `_id`, `version` and `op_success` are
/// stripped from the written sections, so an existing document keeps its
/// stored version and later CAS operations stay sound. The entity is not
/// modified.
///
/// # Errors
///
/// Returns the store's error unchanged.
pub fn save_unversioned<E: VersionedEntity>(
    entity: &E,
    collection: &VersionedCollection,
) -> VAtomicResult<WriteOutcome> {
    let mut fields = entity.to_document().without_versioning_fields();
    fields.remove(ID_FIELD);

    let request = WriteRequest::new(
        Filter::by_id(entity.id()),
        UpdateSpec::set(fields),
        WriteOptions {
            upsert: true,
            return_after: true,
        },
    );
    collection
        .executor()
        .execute(OpKind::Save, &request, Primitive::UpdateOne)
}

fn check_valid<E: VersionedEntity>(entity: &E, op: OpKind) -> VAtomicResult<()> {
    entity.validate().map_err(|messages| {
        warn!(
            target: "vatomic::cas",
            op = %op,
            id = %entity.id(),
            errors = ?messages,
            "validation failed, nothing sent"
        );
        VAtomicError::Validation(messages)
    })
}

fn precondition_not_met<E: VersionedEntity>(entity: &mut E, op: OpKind) -> VersionedWrite {
    let outcome = CasOutcome::precondition_not_met();
    entity.version_state_mut().record(&outcome);
    debug!(
        target: "vatomic::cas",
        op = %op,
        id = %entity.id(),
        version = entity.version(),
        "precondition not met, nothing sent"
    );
    VersionedWrite {
        request: None,
        outcome,
    }
}

fn finish<E: VersionedEntity>(entity: &mut E, op: OpKind, outcome: &CasOutcome) {
    entity.version_state_mut().record(outcome);
    debug!(
        target: "vatomic::cas",
        op = %op,
        id = %entity.id(),
        version = entity.version(),
        status = ?outcome.status,
        "versioned write finished"
    );
}
