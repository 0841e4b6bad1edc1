//! Class-level upsert of a single document

use crate::common::*;
use serde_json::json;

#[test]
fn upsert_returns_updated_document() {
    let (_, coll) = setup();
    let user = create_user(&coll, "bhargav", "bhargav.r.raut@gmail.com");

    let updated = User::versioned_upsert_one(
        &coll,
        Filter::by_id(&user.id).with_version(user.version()),
        UpdateSpec::new().with_set("email", "b.raut@gmail.com"),
        true,
        false,
    )
    .unwrap()
    .unwrap();

    assert_eq!(updated.email, "b.raut@gmail.com");
    assert_eq!(updated.version(), 2);
    let found: User = coll.find(&user.id).unwrap().unwrap();
    assert_eq!(found.email, "b.raut@gmail.com");
}

#[test]
fn empty_filter_touches_no_document() {
    let (store, coll) = setup();
    let a = create_user(&coll, "a", "a@x.com");
    let b = create_user(&coll, "b", "b@x.com");

    let result = User::versioned_upsert_one(
        &coll,
        Filter::new(),
        UpdateSpec::from_value(json!({"$set": {"name": "x"}})).unwrap(),
        true,
        false,
    )
    .unwrap();

    assert!(result.is_none());
    assert_eq!(coll.count(&Filter::new()).unwrap(), 2);
    for user in [&a, &b] {
        let stored = store.get(&user.id).unwrap();
        assert_eq!(stored.version(), Some(1));
        assert_eq!(stored.get("name"), Some(&json!(user.name)));
    }
}

#[test]
fn upsert_inserts_when_nothing_matches() {
    let (store, coll) = setup();
    let id = DocId::new();

    let thing = Thing::versioned_upsert_one(
        &coll,
        Filter::by_id(&id),
        UpdateSpec::new().with_set("entries.e1", 5),
        true,
        false,
    )
    .unwrap()
    .unwrap();

    assert_eq!(thing.id, id);
    assert_eq!(thing.version(), 1);
    assert_eq!(thing.entries.get("e1"), Some(&5));
    assert_eq!(store.len(), 1);
}

#[test]
fn no_upsert_and_no_match_returns_none() {
    let (store, coll) = setup();
    let result = Thing::versioned_upsert_one(
        &coll,
        Filter::by_id(&DocId::new()),
        UpdateSpec::new().with_set("entries.e1", 5),
        false,
        false,
    )
    .unwrap();

    assert!(result.is_none());
    assert!(store.is_empty());
}

#[test]
fn stale_version_filter_matches_nothing() {
    let (store, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");
    user.likes = 1;
    user.versioned_update(&coll, &[], false, None).unwrap();

    let result = User::versioned_upsert_one(
        &coll,
        Filter::by_id(&user.id).with_version(1),
        UpdateSpec::new().with_set("name", "late"),
        false,
        false,
    )
    .unwrap();

    assert!(result.is_none());
    assert_eq!(store.get(&user.id).unwrap().get("name"), Some(&json!("a")));
}

#[test]
fn bypass_with_empty_update_sends_nothing() {
    let (store, coll) = setup();
    let user = create_user(&coll, "a", "a@x.com");

    let result =
        User::versioned_upsert_one(&coll, Filter::by_id(&user.id), UpdateSpec::new(), false, true)
            .unwrap();

    assert!(result.is_none());
    assert_eq!(store.get(&user.id).unwrap().version(), Some(1));
}

#[test]
fn bypass_leaves_version_alone() {
    let (store, coll) = setup();
    let user = create_user(&coll, "a", "a@x.com");

    let updated = User::versioned_upsert_one(
        &coll,
        Filter::by_id(&user.id),
        UpdateSpec::new().with_inc("likes", 4),
        false,
        true,
    )
    .unwrap()
    .unwrap();

    assert_eq!(updated.likes, 4);
    assert_eq!(updated.version(), 1);
    assert_eq!(store.get(&user.id).unwrap().version(), Some(1));
}

#[test]
fn invalid_update_is_a_store_error() {
    let (_, coll) = setup();
    let user = create_user(&coll, "a", "a@x.com");

    let err = User::versioned_upsert_one(
        &coll,
        Filter::by_id(&user.id),
        UpdateSpec::new().with_inc("name", 1),
        false,
        false,
    )
    .unwrap_err();

    assert!(err.is_store_failure());
}

#[test]
fn caller_update_cannot_rewind_version() {
    let (store, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");
    assert!(user.versioned_update(&coll, &[], false, None).unwrap().success());

    let err = User::versioned_upsert_one(
        &coll,
        Filter::by_id(&user.id),
        UpdateSpec::new().with_set("version", 0),
        false,
        true,
    )
    .unwrap_err();
    assert!(matches!(err, VAtomicError::InvalidUpdate(_)));

    let err = user
        .versioned_update(&coll, &[], true, Some(UpdateSpec::new().with_set("version", 0)))
        .unwrap_err();
    assert!(matches!(err, VAtomicError::InvalidUpdate(_)));
    assert_eq!(user.version(), 2);
    assert_eq!(store.get(&user.id).unwrap().version(), Some(2));
}
