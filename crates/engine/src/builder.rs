//! Request Builder
//!
//! Pure functions turning entity state and call parameters into the
//! `(filter, update, options)` triple of a CAS request. Nothing here touches
//! the store.
//!
//! | Operation  | Precondition | Filter               | Update                         | Options         |
//! |------------|--------------|----------------------|--------------------------------|-----------------|
//! | create     | version == 0 | caller filter or id  | `$setOnInsert` fields + v = 1  | upsert, after   |
//! | update     | version > 0  | id + version         | `$set` fields, `$inc` v + 1    | after           |
//! | upsert one | filter != {} | caller filter        | caller update, `$inc` v + 1    | caller, after   |
//!
//! Caller-supplied update sections may not name `_id`, `version` or
//! `op_success`. The version only ever moves through the builder's own
//! increment.

use serde_json::Value;
use vatomic_core::{
    is_reserved, Document, Filter, UpdateSpec, VAtomicError, VAtomicResult, VersionedEntity,
    WriteOptions, WriteRequest, ID_FIELD, VERSION_FIELD,
};

/// An update request plus what the reconciler needs to verify it
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// The request to issue
    pub request: WriteRequest,
    /// Version the document must carry after a successful write
    pub expected_version: u64,
    /// Versioning was bypassed for this call
    pub bypass_versioning: bool,
}

/// Build the create CAS for a fresh entity
///
/// Returns `None` unless `entity.version() == 0`. An empty `filter` falls
/// back to `{_id: entity.id}`. Every entity field plus `_id` and
/// `version: 1` goes into `$setOnInsert`, so nothing is written when the
/// filter matches an existing document.
pub fn build_create_request<E: VersionedEntity>(
    entity: &E,
    filter: Option<Filter>,
) -> Option<WriteRequest> {
    if entity.version() != 0 {
        return None;
    }

    let filter = match filter {
        Some(filter) if !filter.is_empty() => filter,
        _ => Filter::by_id(entity.id()),
    };

    let mut on_insert = entity.fields_document();
    on_insert.insert(ID_FIELD.to_string(), entity.id().to_value());
    on_insert.insert(VERSION_FIELD.to_string(), Value::from(1u64));

    Some(WriteRequest::new(
        filter,
        UpdateSpec::set_on_insert(Document::new().with("version", 5)),
        WriteOptions::create(),
    ))
}

/// Build the update CAS for a persisted entity
///
/// Returns `Ok(None)` unless `entity.version() > 0`.
///
/// Field values always come from the entity. With an empty `dirty_fields`
/// every field is written; otherwise only the named ones (reserved names are
/// skipped). A non-empty `override_update` replaces the computed update, but
/// the version increment is still added unless `bypass_versioning`.
///
/// # Errors
///
/// Returns a mapping error if a dirty field is not a field of the entity, and
/// [`VAtomicError::InvalidUpdate`] if `override_update` names a reserved
/// field.
pub fn build_update_request<E: VersionedEntity>(
    entity: &E,
    dirty_fields: &[&str],
    bypass_versioning: bool,
    override_update: Option<UpdateSpec>,
) -> VAtomicResult<Option<UpdatePlan>> {
    let version = entity.version();
    if version == 0 {
        return Ok(None);
    }

    let mut filter = Filter::by_id(entity.id());
    if !bypass_versioning {
        filter = filter.with_version(version);
    }

    let mut update = match override_update.filter(|u| !u.is_empty()) {
        Some(update) => {
            reject_reserved(&update)?;
            update
        }
        None => UpdateSpec::set(selected_fields(entity, dirty_fields)?),
    };
    if !bypass_versioning {
        update.increment_version();
    }

    Ok(Some(UpdatePlan {
        request: WriteRequest::new(filter, update, WriteOptions::update()),
        expected_version: version + 1,
        bypass_versioning,
    }))
}

fn selected_fields<E: VersionedEntity>(
    entity: &E,
    dirty_fields: &[&str],
) -> VAtomicResult<Document> {
    if dirty_fields.is_empty() {
        return Ok(entity.fields_document());
    }

    let mut set = Document::new();
    for name in dirty_fields.iter().filter(|name| !is_reserved(name)) {
        let value = entity
            .get_field(name)
            .ok_or_else(|| VAtomicError::mapping(*name, "not a field of this entity"))?;
        set.insert(name.to_string(), value);
    }
    Ok(set)
}

/// Reject caller sections that write a reserved field
///
/// Dotted paths count by their first segment, so `version.x` is rejected
/// too.
fn reject_reserved(update: &UpdateSpec) -> VAtomicResult<()> {
    let set_on_insert = update.set_on_insert.iter().flat_map(|d| d.keys());
    let set = update.set.iter().flat_map(|d| d.keys());
    let reserved = set_on_insert
        .chain(set)
        .chain(update.inc.keys())
        .find(|path| is_reserved(path.split('.').next().unwrap_or(path.as_str())));
    match reserved {
        Some(path) => Err(VAtomicError::invalid_update(format!(
            "'{}' is reserved for versioning and cannot be written by the caller",
            path
        ))),
        None => Ok(()),
    }
}

/// Build a class-level upsert of one document
///
/// Returns `Ok(None)` ("nothing to do") when the update ends up empty, and
/// for an empty filter: with no precondition the write could land on any
/// document, so versioning is forced off and nothing is issued.
///
/// # Errors
///
/// Returns [`VAtomicError::InvalidUpdate`] if `update` names a reserved
/// field.
pub fn build_upsert_one_request(
    filter: Filter,
    mut update: UpdateSpec,
    upsert: bool,
    bypass_versioning: bool,
) -> VAtomicResult<Option<WriteRequest>> {
    if filter.is_empty() {
        return Ok(None);
    }
    reject_reserved(&update)?;
    if !bypass_versioning {
        update.increment_version();
    }
    if update.is_empty() {
        return Ok(None);
    }
    Ok(Some(WriteRequest::new(
        filter,
        update,
        WriteOptions {
            upsert,
            return_after: true,
        },
    )))
}
