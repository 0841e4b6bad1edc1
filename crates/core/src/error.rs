//! Error types for vatomic
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Version conflicts and writes that matched nothing are NOT errors. They are
//! reported as data through [`crate::outcome::CasOutcome`] and the entity's
//! `op_success` marker. Only the variants below abort a call.

use std::io;
use thiserror::Error;

/// Result type alias for vatomic operations
pub type VAtomicResult<T> = std::result::Result<T, VAtomicError>;

/// Error types for vatomic
#[derive(Debug, Error)]
pub enum VAtomicError {
    /// Transport or driver failure reported by the document store
    #[error("Store error: {0}")]
    Store(String),

    /// The entity failed validation; no write was attempted
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A raw document could not be mapped onto a typed entity
    #[error("Mapping error on field '{field}': {reason}")]
    Mapping {
        /// Field that could not be mapped
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The update specification cannot be applied
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VAtomicError {
    /// Create a store failure
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a validation failure from a single message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    /// Create a mapping error
    pub fn mapping(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mapping {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid update error
    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures raised by the store collaborator
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::InvalidUpdate(_))
    }
}
