//! Entity state and the versioning capability
//!
//! Any document type becomes versioned by implementing [`VersionedEntity`]:
//! it embeds a [`VersionState`] (version counter plus per-call outcome
//! markers) and exposes its fields through a static [`FieldRegistry`].
//!
//! ## Field registry
//!
//! The registry maps each field name to a typed getter/setter pair. It is
//! built once per entity type, usually behind `once_cell::sync::Lazy`:
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use vatomic_core::entity::{decode, FieldRegistry};
//!
//! #[derive(Clone, Default)]
//! struct Tag { label: String }
//!
//! static TAG_FIELDS: Lazy<FieldRegistry<Tag>> = Lazy::new(|| {
//!     FieldRegistry::<Tag>::builder()
//!         .field("label", |t| t.label.clone().into(), |t, v| {
//!             t.label = decode("label", v)?;
//!             Ok(())
//!         })
//!         .build()
//! });
//!
//! assert_eq!(TAG_FIELDS.names().collect::<Vec<_>>(), vec!["label"]);
//! ```
//!
//! Reserved names (`_id`, `version`, `op_success`) belong to the capability
//! and cannot be registered.

use crate::document::{is_reserved, DocId, Document, ID_FIELD, VERSION_FIELD};
use crate::error::{VAtomicError, VAtomicResult};
use crate::halt::HookResult;
use crate::outcome::CasOutcome;
use crate::traits::DocumentStore;
use serde::de::DeserializeOwned;
use serde_json::Value;

// =============================================================================
// VersionState
// =============================================================================

/// Version counter and per-call outcome markers
///
/// `version` only ever moves through a successful CAS: to 1 on create and by
/// exactly one on each update. The remaining fields describe the last call
/// and are reset at the start of every create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionState {
    /// CAS version counter (0 = never persisted)
    pub version: u64,
    /// Unset before the first call; `Some(false)` until a call succeeds
    pub op_success: Option<bool>,
    /// Matched count of the last write, when reported
    pub matched_count: Option<u64>,
    /// Modified count of the last write, when reported
    pub modified_count: Option<u64>,
    /// Id inserted by the last write, if any
    pub upserted_id: Option<DocId>,
}

impl VersionState {
    /// State of a fresh, never persisted entity
    pub fn new() -> Self {
        Self::default()
    }

    /// State of an entity loaded at `version`
    pub fn at_version(version: u64) -> Self {
        VersionState {
            version,
            ..Self::default()
        }
    }

    /// Clear the markers at the start of a call
    pub fn begin_call(&mut self) {
        self.op_success = Some(false);
        self.matched_count = None;
        self.modified_count = None;
        self.upserted_id = None;
    }

    /// Record the outcome of a call
    pub fn record(&mut self, outcome: &CasOutcome) {
        self.op_success = Some(outcome.success());
        self.matched_count = outcome.matched_count;
        self.modified_count = outcome.modified_count;
        self.upserted_id = outcome.upserted_id.clone();
    }
}

// =============================================================================
// Field Registry
// =============================================================================

/// Reads a field as a JSON value
pub type FieldGetter<E> = fn(&E) -> Value;

/// Writes a field from a JSON value
pub type FieldSetter<E> = fn(&mut E, Value) -> VAtomicResult<()>;

/// Typed accessor pair for one field
pub struct FieldAccessor<E> {
    name: &'static str,
    get: FieldGetter<E>,
    set: FieldSetter<E>,
}

impl<E> FieldAccessor<E> {
    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the field
    pub fn get(&self, entity: &E) -> Value {
        (self.get)(entity)
    }

    /// Write the field
    pub fn set(&self, entity: &mut E, value: Value) -> VAtomicResult<()> {
        (self.set)(entity, value)
    }
}

/// Static mapping of field name to typed accessors
pub struct FieldRegistry<E> {
    fields: Vec<FieldAccessor<E>>,
}

impl<E> FieldRegistry<E> {
    /// Start building a registry
    pub fn builder() -> FieldRegistryBuilder<E> {
        FieldRegistryBuilder { fields: Vec::new() }
    }

    /// Look up an accessor
    pub fn field(&self, name: &str) -> Option<&FieldAccessor<E>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// All accessors
    pub fn iter(&self) -> impl Iterator<Item = &FieldAccessor<E>> {
        self.fields.iter()
    }

    /// Number of registered fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no field is registered
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`FieldRegistry`]
pub struct FieldRegistryBuilder<E> {
    fields: Vec<FieldAccessor<E>>,
}

impl<E> FieldRegistryBuilder<E> {
    /// Register a field
    ///
    /// # Panics
    ///
    /// Panics if `name` is reserved or already registered. Registries are
    /// static, so this surfaces on first use of the entity type.
    pub fn field(mut self, name: &'static str, get: FieldGetter<E>, set: FieldSetter<E>) -> Self {
        assert!(!is_reserved(name), "field name '{}' is reserved", name);
        assert!(
            self.fields.iter().all(|f| f.name != name),
            "field '{}' registered twice",
            name
        );
        self.fields.push(FieldAccessor { name, get, set });
        self
    }

    /// Finish the registry
    pub fn build(self) -> FieldRegistry<E> {
        FieldRegistry {
            fields: self.fields,
        }
    }
}

/// Decode a field value, mapping failures to [`VAtomicError::Mapping`]
pub fn decode<T: DeserializeOwned>(field: &str, value: Value) -> VAtomicResult<T> {
    serde_json::from_value(value).map_err(|e| VAtomicError::mapping(field, e.to_string()))
}

// =============================================================================
// VersionedEntity
// =============================================================================

/// The versioning capability
///
/// Implementors own an id, a [`VersionState`] and a static field registry.
/// Lifecycle hooks default to no-ops. After-write hooks return
/// [`HookResult`]; returning `Err(Halt)` stops the rest of the chain.
pub trait VersionedEntity: Clone + Send + Sized + 'static {
    /// Field accessors for this type
    fn registry() -> &'static FieldRegistry<Self>;

    /// Blank entity carrying `id`, every field at its default
    fn with_id(id: DocId) -> Self;

    /// Document id
    fn id(&self) -> &DocId;

    /// Versioning state
    fn version_state(&self) -> &VersionState;

    /// Mutable versioning state
    fn version_state_mut(&mut self) -> &mut VersionState;

    /// Current version
    fn version(&self) -> u64 {
        self.version_state().version
    }

    /// Success marker of the last create/update
    fn op_success(&self) -> Option<bool> {
        self.version_state().op_success
    }

    /// Validate before any store interaction
    ///
    /// Returning messages aborts the call with [`VAtomicError::Validation`].
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Runs before a create request is built
    fn before_create(&mut self) {}

    /// Runs after a create that inserted a document
    fn after_create(&mut self, _store: &dyn DocumentStore, _outcome: &CasOutcome) -> HookResult {
        Ok(())
    }

    /// Runs before an update request is built
    fn before_update(&mut self) {}

    /// Runs after an update that modified the document
    fn after_update(&mut self, _store: &dyn DocumentStore, _outcome: &CasOutcome) -> HookResult {
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Registry-backed accessors
    // ---------------------------------------------------------------------

    /// Names of every entity field (reserved fields excluded)
    fn field_names() -> Vec<&'static str> {
        Self::registry().names().collect()
    }

    /// Read a field by name
    fn get_field(&self, name: &str) -> Option<Value> {
        Self::registry().field(name).map(|f| f.get(self))
    }

    /// Write a field by name
    ///
    /// Returns `Ok(false)` for names the registry does not know.
    fn set_field(&mut self, name: &str, value: Value) -> VAtomicResult<bool> {
        match Self::registry().field(name) {
            Some(accessor) => {
                accessor.set(self, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Entity fields only, without `_id` / `version` / `op_success`
    fn fields_document(&self) -> Document {
        Self::registry()
            .iter()
            .map(|f| (f.name().to_string(), f.get(self)))
            .collect()
    }

    /// Full document as stored: `_id`, fields and `version`
    fn to_document(&self) -> Document {
        let mut doc = self.fields_document();
        doc.insert(ID_FIELD.to_string(), self.id().to_value());
        doc.insert(VERSION_FIELD.to_string(), Value::from(self.version()));
        doc
    }

    /// Map a raw document onto a typed entity
    ///
    /// `None` in, `None` out. A missing `_id` is a mapping error; a missing
    /// `version` maps to 0. Unknown fields are ignored.
    fn from_document(doc: Option<Document>) -> VAtomicResult<Option<Self>> {
        let doc = match doc {
            Some(doc) => doc,
            None => return Ok(None),
        };
        let id = doc
            .id()
            .ok_or_else(|| VAtomicError::mapping(ID_FIELD, "missing or not a string"))?;
        let mut entity = Self::with_id(id);
        *entity.version_state_mut() = VersionState::at_version(doc.version().unwrap_or(0));
        for accessor in Self::registry().iter() {
            if let Some(value) = doc.get(accessor.name()) {
                accessor.set(&mut entity, value.clone())?;
            }
        }
        Ok(Some(entity))
    }
}
