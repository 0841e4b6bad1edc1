//! Shared entities and helpers for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
pub use vatomic::{
    build_upsert_one_request, decode, CasOutcome, CasStatus, DocId, DocumentStore,
    FieldRegistry, Filter, Halt, HookResult, InMemoryStore, SuccessCheck, UpdateSpec,
    VAtomicConfig, VAtomicError, VersionState, VersionedAtomic, VersionedCollection,
    VersionedEntity,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Fresh store plus a collection over it (the store handle shares data)
pub fn setup() -> (InMemoryStore, VersionedCollection) {
    let store = InMemoryStore::new();
    (store.clone(), VersionedCollection::new(store))
}

/// Same as [`setup`] with the write-counts success check
pub fn setup_write_counts() -> (InMemoryStore, VersionedCollection) {
    let (store, coll) = setup();
    let coll = coll.with_config(VAtomicConfig {
        success_check: SuccessCheck::WriteCounts,
        log_requests: false,
    });
    (store, coll)
}

/// Create a valid user and assert it landed
pub fn create_user(coll: &VersionedCollection, name: &str, email: &str) -> User {
    let mut user = User::new(name, email);
    let write = user.versioned_create(coll, None).unwrap();
    assert!(write.success(), "create of {} should succeed", name);
    user
}

// ============================================================================
// User
// ============================================================================

/// User with validation and one marker field per lifecycle hook
#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: DocId,
    pub state: VersionState,
    pub name: String,
    pub email: String,
    pub likes: i64,
    pub before_create_field: i64,
    pub after_create_field: i64,
    pub before_update_field: i64,
    pub after_update_field: i64,
}

macro_rules! user_field {
    ($builder:expr, $name:ident) => {
        $builder.field(
            stringify!($name),
            |u| serde_json::json!(u.$name),
            |u, v| {
                u.$name = decode(stringify!($name), v)?;
                Ok(())
            },
        )
    };
}

static USER_FIELDS: Lazy<FieldRegistry<User>> = Lazy::new(|| {
    let builder = FieldRegistry::<User>::builder();
    let builder = user_field!(builder, name);
    let builder = user_field!(builder, email);
    let builder = user_field!(builder, likes);
    let builder = user_field!(builder, before_create_field);
    let builder = user_field!(builder, after_create_field);
    let builder = user_field!(builder, before_update_field);
    let builder = user_field!(builder, after_update_field);
    builder.build()
});

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        User {
            name: name.to_string(),
            email: email.to_string(),
            ..User::with_id(DocId::new())
        }
    }
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\A([^@\s]+)@((?:[-a-z0-9]+\.)+[a-z]{2,})\z").expect("email pattern")
});

fn is_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

impl VersionedEntity for User {
    fn registry() -> &'static FieldRegistry<Self> {
        &USER_FIELDS
    }

    fn with_id(id: DocId) -> Self {
        User {
            id,
            ..User::default()
        }
    }

    fn id(&self) -> &DocId {
        &self.id
    }

    fn version_state(&self) -> &VersionState {
        &self.state
    }

    fn version_state_mut(&mut self) -> &mut VersionState {
        &mut self.state
    }

    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("There should be a user name".to_string());
        }
        if !is_email(&self.email) {
            errors.push("Email is invalid".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn before_create(&mut self) {
        self.before_create_field = 1;
    }

    fn after_create(&mut self, _store: &dyn DocumentStore, _outcome: &CasOutcome) -> HookResult {
        self.after_create_field = 1;
        Ok(())
    }

    fn before_update(&mut self) {
        self.before_update_field = 1;
    }

    fn after_update(&mut self, _store: &dyn DocumentStore, _outcome: &CasOutcome) -> HookResult {
        self.after_update_field = 1;
        Ok(())
    }
}

// ============================================================================
// Thing / Entry
// ============================================================================

/// Parent document indexing its entries under `entries.<entry id>`
#[derive(Debug, Clone, Default)]
pub struct Thing {
    pub id: DocId,
    pub state: VersionState,
    pub entries: BTreeMap<String, i64>,
}

static THING_FIELDS: Lazy<FieldRegistry<Thing>> = Lazy::new(|| {
    FieldRegistry::<Thing>::builder()
        .field(
            "entries",
            |t| serde_json::json!(t.entries),
            |t, v| {
                t.entries = decode("entries", v)?;
                Ok(())
            },
        )
        .build()
});

impl VersionedEntity for Thing {
    fn registry() -> &'static FieldRegistry<Self> {
        &THING_FIELDS
    }

    fn with_id(id: DocId) -> Self {
        Thing {
            id,
            ..Thing::default()
        }
    }

    fn id(&self) -> &DocId {
        &self.id
    }

    fn version_state(&self) -> &VersionState {
        &self.state
    }

    fn version_state_mut(&mut self) -> &mut VersionState {
        &mut self.state
    }
}

/// Child document that registers itself on its parent thing once created
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub id: DocId,
    pub state: VersionState,
    pub name: String,
    pub parent_thing_id: Option<DocId>,
    /// Stamp written into the parent's index
    pub stamp: i64,
    /// Set by the after-create hook when the parent accepted the entry
    pub indexed: bool,
}

static ENTRY_FIELDS: Lazy<FieldRegistry<Entry>> = Lazy::new(|| {
    FieldRegistry::<Entry>::builder()
        .field(
            "name",
            |e| e.name.clone().into(),
            |e, v| {
                e.name = decode("name", v)?;
                Ok(())
            },
        )
        .field(
            "parent_thing_id",
            |e| serde_json::json!(e.parent_thing_id),
            |e, v| {
                e.parent_thing_id = decode("parent_thing_id", v)?;
                Ok(())
            },
        )
        .field(
            "stamp",
            |e| e.stamp.into(),
            |e, v| {
                e.stamp = decode("stamp", v)?;
                Ok(())
            },
        )
        .build()
});

impl VersionedEntity for Entry {
    fn registry() -> &'static FieldRegistry<Self> {
        &ENTRY_FIELDS
    }

    fn with_id(id: DocId) -> Self {
        Entry {
            id,
            ..Entry::default()
        }
    }

    fn id(&self) -> &DocId {
        &self.id
    }

    fn version_state(&self) -> &VersionState {
        &self.state
    }

    fn version_state_mut(&mut self) -> &mut VersionState {
        &mut self.state
    }

    fn after_create(&mut self, store: &dyn DocumentStore, _outcome: &CasOutcome) -> HookResult {
        let parent = self.parent_thing_id.clone().ok_or_else(Halt::requested)?;
        let request = build_upsert_one_request(
            Filter::by_id(&parent),
            UpdateSpec::new().with_set(format!("entries.{}", self.id), self.stamp),
            false,
            false,
        )
        .ok()
        .flatten()
        .ok_or_else(Halt::requested)?;

        match store.find_and_modify(&request.filter, &request.update, request.options) {
            Ok(Some(_)) => {
                self.indexed = true;
                Ok(())
            }
            Ok(None) | Err(_) => Err(Halt::requested()),
        }
    }
}
