//! Update CAS: `{_id, version}` precondition, version bumped by one

use crate::common::*;
use serde_json::json;

#[test]
fn update_without_dirty_fields_writes_everything() {
    let (_, coll) = setup();
    let mut user = create_user(&coll, "bhargav", "bhargav.r.raut@gmail.com");

    user.email = "c@gmail.com".to_string();
    let write = user.versioned_update(&coll, &[], false, None).unwrap();

    assert!(write.success());
    assert_eq!(user.version(), 2);
    assert_eq!(user.email, "c@gmail.com");
    assert_eq!(user.op_success(), Some(true));

    let found: User = coll.find(&user.id).unwrap().unwrap();
    assert_eq!(found.version(), 2);
    assert_eq!(found.email, "c@gmail.com");
}

#[test]
fn update_with_dirty_fields_reverts_unlisted_changes() {
    let (_, coll) = setup();
    let mut user = create_user(&coll, "bhargav", "bhargav.r.raut@gmail.com");

    user.email = "c@gmail.com".to_string();
    user.name = "doggy".to_string();
    let write = user.versioned_update(&coll, &["email"], false, None).unwrap();

    assert!(write.success());
    assert_eq!(user.version(), 2);
    assert_eq!(user.email, "c@gmail.com");
    assert_eq!(user.name, "bhargav");

    let found: User = coll.find(&user.id).unwrap().unwrap();
    assert_eq!(found.email, "c@gmail.com");
    assert_eq!(found.name, "bhargav");
}

#[test]
fn reread_after_update_matches_entity() {
    let (_, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");
    user.likes = 10;
    user.versioned_update(&coll, &[], false, None).unwrap();

    let found: User = coll.find(&user.id).unwrap().unwrap();
    assert_eq!(found.version(), user.version());
    assert_eq!(found.likes, user.likes);
    assert_eq!(found.name, user.name);
    assert_eq!(found.email, user.email);
}

#[test]
fn update_on_unpersisted_entity_sends_nothing() {
    let (store, coll) = setup();
    let mut user = User::new("a", "a@x.com");

    let write = user.versioned_update(&coll, &[], false, None).unwrap();

    assert_eq!(write.outcome.status, CasStatus::PreconditionNotMet);
    assert_eq!(user.op_success(), Some(false));
    assert_eq!(user.before_update_field, 0);
    assert!(store.is_empty());
}

#[test]
fn stale_update_after_out_of_band_upsert_fails() {
    let (store, coll) = setup();
    let mut user = create_user(&coll, "bhargav", "b.r.raut@gmail.com");

    let bumped = User::versioned_upsert_one(
        &coll,
        Filter::by_id(&user.id).with_version(user.version()),
        UpdateSpec::new().with_set("email", "kkk@gmail.com"),
        false,
        false,
    )
    .unwrap()
    .unwrap();
    assert_eq!(bumped.version(), 2);

    user.name = "changed_name".to_string();
    let write = user.versioned_update(&coll, &[], false, None).unwrap();

    assert_eq!(write.outcome.status, CasStatus::NoEffect);
    assert_eq!(user.op_success(), Some(false));
    assert_eq!(user.version(), 1);
    assert_eq!(user.name, "changed_name");
    assert_eq!(user.after_update_field, 0);

    let stored = store.get(&user.id).unwrap();
    assert_eq!(stored.version(), Some(2));
    assert_eq!(stored.get("name"), Some(&json!("bhargav")));
    assert_eq!(stored.get("email"), Some(&json!("kkk@gmail.com")));
}

#[test]
fn retry_after_reload_succeeds() {
    let (_, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");
    let mut other: User = coll.find(&user.id).unwrap().unwrap();

    other.likes = 1;
    assert!(other.versioned_update(&coll, &["likes"], false, None).unwrap().success());

    user.name = "b".to_string();
    assert!(!user.versioned_update(&coll, &["name"], false, None).unwrap().success());

    let mut reloaded: User = coll.find(&user.id).unwrap().unwrap();
    reloaded.name = "b".to_string();
    assert!(reloaded.versioned_update(&coll, &["name"], false, None).unwrap().success());
    assert_eq!(reloaded.version(), 3);
    assert_eq!(reloaded.likes, 1);
}

#[test]
fn bypass_versioning_writes_without_precondition() {
    let (store, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");
    let mut stale = user.clone();

    user.likes = 5;
    assert!(user.versioned_update(&coll, &["likes"], false, None).unwrap().success());

    stale.name = "forced".to_string();
    let write = stale.versioned_update(&coll, &["name"], true, None).unwrap();
    assert!(write.success());
    assert_eq!(write.request.unwrap().filter, Filter::by_id(&stale.id));

    let stored = store.get(&user.id).unwrap();
    assert_eq!(stored.version(), Some(2));
    assert_eq!(stored.get("name"), Some(&json!("forced")));
    assert_eq!(stale.version(), 2);
    assert_eq!(stale.likes, 5);
}

#[test]
fn override_update_is_merged_with_version_increment() {
    let (store, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");

    let override_update = UpdateSpec::new().with_inc("likes", 3).with_set("name", "z");
    let write = user
        .versioned_update(&coll, &[], false, Some(override_update))
        .unwrap();

    assert!(write.success());
    let update = write.request.unwrap().update;
    assert_eq!(update.inc.get("version"), Some(&1));
    assert_eq!(user.likes, 3);
    assert_eq!(user.name, "z");
    assert_eq!(store.get(&user.id).unwrap().version(), Some(2));
}

#[test]
fn validation_failure_on_update_sends_nothing() {
    let (store, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");

    user.email = "not an email".to_string();
    let err = user.versioned_update(&coll, &[], false, None).unwrap_err();

    assert!(matches!(err, VAtomicError::Validation(_)));
    assert_eq!(user.op_success(), Some(false));
    assert_eq!(store.get(&user.id).unwrap().get("email"), Some(&json!("a@x.com")));
}

#[test]
fn write_counts_mode_reports_counts_and_refreshes() {
    let (_, coll) = setup_write_counts();
    let mut user = create_user(&coll, "a", "a@x.com");

    user.email = "new@x.com".to_string();
    user.name = "dropped".to_string();
    let write = user.versioned_update(&coll, &["email"], false, None).unwrap();

    assert!(write.success());
    assert_eq!(user.state.matched_count, Some(1));
    assert_eq!(user.state.modified_count, Some(1));
    assert_eq!(user.version(), 2);
    assert_eq!(user.name, "a");

    let mut stale = user.clone();
    stale.state.version = 1;
    let write = stale.versioned_update(&coll, &[], false, None).unwrap();
    assert!(!write.success());
    assert_eq!(stale.state.matched_count, Some(0));
    assert_eq!(stale.state.modified_count, Some(0));
}

#[test]
fn returned_document_mode_leaves_counts_unset() {
    let (_, coll) = setup();
    let mut user = create_user(&coll, "a", "a@x.com");

    user.likes = 2;
    user.versioned_update(&coll, &[], false, None).unwrap();

    assert_eq!(user.state.matched_count, None);
    assert_eq!(user.state.modified_count, None);
}
