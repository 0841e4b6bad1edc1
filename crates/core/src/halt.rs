//! Halt signal for post-write hook chains
//!
//! A `Halt` stops the remaining after-create / after-update hooks of one
//! call. It is local control flow: the operation that runs the chain
//! consumes it and it never reaches the caller of `versioned_create` /
//! `versioned_update`.

use std::fmt;
use thiserror::Error;

/// Why a hook chain was halted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A create neither inserted nor matched a document
    NothingInserted,
    /// An update did not modify exactly one document
    NotModified,
    /// A hook asked to stop the chain
    Requested,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::NothingInserted => write!(f, "nothing inserted"),
            HaltReason::NotModified => write!(f, "nothing modified"),
            HaltReason::Requested => write!(f, "requested by hook"),
        }
    }
}

/// Control-flow signal stopping a hook chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hook chain halted: {reason}")]
pub struct Halt {
    /// Why the chain stopped
    pub reason: HaltReason,
}

impl Halt {
    /// Halt with the given reason
    pub const fn new(reason: HaltReason) -> Self {
        Halt { reason }
    }

    /// Halt raised by a hook itself
    pub const fn requested() -> Self {
        Halt::new(HaltReason::Requested)
    }
}

/// Result type of after-write hooks
pub type HookResult = std::result::Result<(), Halt>;
