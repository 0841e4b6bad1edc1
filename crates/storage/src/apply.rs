//! Filter matching and update application
//!
//! The subset of document-store semantics the CAS protocol relies on:
//!
//! - Filters are top-level (or dotted) field equality. A missing field only
//!   matches a `null` filter value.
//! - `$setOnInsert` applies only when a document is being inserted.
//! - `$set` assigns, creating intermediate objects for dotted paths.
//! - `$inc` adds an integer delta; a missing field counts as 0.
//!
//! Updates are applied to a scratch copy, so a failing update never leaves a
//! half-written document behind.

use serde_json::Value;
use std::collections::BTreeSet;
use vatomic_core::{Document, Filter, UpdateSpec, VAtomicError, VAtomicResult, ID_FIELD};

/// True if `doc` satisfies every equality in `filter`
pub fn matches(filter: &Filter, doc: &Document) -> bool {
    filter.iter().all(|(path, expected)| match doc.get_path(path) {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

/// Reject updates that touch the same path from two sections
pub fn check_conflicts(update: &UpdateSpec) -> VAtomicResult<()> {
    let mut seen = BTreeSet::new();
    let insert_paths = update.set_on_insert.iter().flat_map(|d| d.keys());
    let set_paths = update.set.iter().flat_map(|d| d.keys());
    for path in insert_paths.chain(set_paths).chain(update.inc.keys()) {
        if !seen.insert(path.as_str()) {
            return Err(VAtomicError::invalid_update(format!(
                "conflicting update sections for path '{}'",
                path
            )));
        }
    }
    if update
        .set
        .as_ref()
        .map_or(false, |d| d.contains_key(ID_FIELD))
        || update.inc.contains_key(ID_FIELD)
    {
        return Err(VAtomicError::invalid_update("'_id' is immutable"));
    }
    Ok(())
}

/// Apply `update` to a copy of `doc`
///
/// `inserting` selects whether `$setOnInsert` takes part.
pub fn apply_update(doc: &Document, update: &UpdateSpec, inserting: bool) -> VAtomicResult<Document> {
    let mut next = doc.clone();

    if inserting {
        if let Some(on_insert) = &update.set_on_insert {
            for (path, value) in on_insert.iter() {
                assign(&mut next, path, value.clone())?;
            }
        }
    }

    if let Some(set) = &update.set {
        for (path, value) in set.iter() {
            assign(&mut next, path, value.clone())?;
        }
    }

    for (path, delta) in &update.inc {
        let current = match next.get_path(path) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                VAtomicError::invalid_update(format!(
                    "cannot apply $inc to non-integer field '{}'",
                    path
                ))
            })?,
        };
        let updated = current.checked_add(*delta).ok_or_else(|| {
            VAtomicError::invalid_update(format!("$inc overflow on field '{}'", path))
        })?;
        assign(&mut next, path, Value::from(updated))?;
    }

    Ok(next)
}

/// Seed a document to be upserted from the filter's equality fields
///
/// Reserved fields are taken from the filter too, so an upsert on
/// `{_id, version}` inserts a document at that id and version.
pub fn seed_from_filter(filter: &Filter) -> VAtomicResult<Document> {
    let mut doc = Document::new();
    for (path, value) in filter.iter() {
        assign(&mut doc, path, value.clone())?;
    }
    Ok(doc)
}

fn assign(doc: &mut Document, path: &str, value: Value) -> VAtomicResult<()> {
    if doc.set_path(path, value) {
        Ok(())
    } else {
        Err(VAtomicError::invalid_update(format!(
            "cannot create field '{}' inside a non-object value",
            path
        )))
    }
}
