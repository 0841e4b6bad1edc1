//! Explicit collection handle
//!
//! A `VersionedCollection` bundles the store collaborator with the engine
//! configuration. Every versioned operation takes one; nothing reaches a
//! globally configured collection.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use vatomic_core::{DocId, DocumentStore, Filter, VAtomicResult, VersionedEntity};

use crate::config::{VAtomicConfig, CONFIG_FILE_NAME};
use crate::executor::Executor;

/// Store handle plus configuration
///
/// Cloning is cheap and shares the underlying store.
#[derive(Clone)]
pub struct VersionedCollection {
    store: Arc<dyn DocumentStore>,
    config: VAtomicConfig,
}

impl VersionedCollection {
    /// Collection over `store` with the default configuration
    pub fn new<S: DocumentStore + 'static>(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Collection over an already shared store
    pub fn from_arc(store: Arc<dyn DocumentStore>) -> Self {
        VersionedCollection {
            store,
            config: VAtomicConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: VAtomicConfig) -> Self {
        self.config = config;
        self
    }

    /// Load `vatomic.toml` from `dir`, writing the default file first if
    /// there is none
    ///
    /// # Errors
    ///
    /// Returns a config error if the file cannot be read or parsed.
    pub fn configure_from_dir(self, dir: &Path) -> VAtomicResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        VAtomicConfig::write_default_if_missing(&path)?;
        let config = VAtomicConfig::from_file(&path)?;
        info!(
            target: "vatomic::cas",
            path = %path.display(),
            success_check = ?config.success_check,
            log_requests = config.log_requests,
            "loaded config"
        );
        Ok(self.with_config(config))
    }

    /// The store collaborator
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Shared handle to the store collaborator
    pub fn store_arc(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Active configuration
    pub fn config(&self) -> &VAtomicConfig {
        &self.config
    }

    pub(crate) fn executor(&self) -> Executor<'_> {
        Executor::new(self.store(), self.config.log_requests)
    }

    /// Load an entity by id
    ///
    /// # Errors
    ///
    /// Returns a store error, or a mapping error if the stored document does
    /// not fit `E`.
    pub fn find<E: VersionedEntity>(&self, id: &DocId) -> VAtomicResult<Option<E>> {
        E::from_document(self.store.find_one(&Filter::by_id(id))?)
    }

    /// Count documents matching `filter`
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub fn count(&self, filter: &Filter) -> VAtomicResult<u64> {
        self.store.count(filter)
    }
}

impl std::fmt::Debug for VersionedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedCollection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
