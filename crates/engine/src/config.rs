//! Engine configuration via `vatomic.toml`
//!
//! A small config file selects how versioned updates confirm success and
//! whether issued requests are echoed to the log. On first use a default
//! `vatomic.toml` can be written next to the application's data.

use serde::{Deserialize, Serialize};
use std::path::Path;
use vatomic_core::{VAtomicError, VAtomicResult};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "vatomic.toml";

/// How a versioned update decides it took effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessCheck {
    /// Issue `find_and_modify` and compare the returned document's version
    /// against the expected one.
    #[default]
    ReturnedDocument,
    /// Issue `update_one`, require `modified_count == 1`, then re-read the
    /// document to refresh the entity.
    WriteCounts,
}

/// Engine configuration loaded from `vatomic.toml`.
///
/// # Example
///
/// ```toml
/// # "returned_document" (default) or "write_counts"
/// success_check = "returned_document"
///
/// # Echo every CAS request at info level
/// log_requests = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VAtomicConfig {
    /// Success criterion for versioned updates.
    #[serde(default)]
    pub success_check: SuccessCheck,
    /// Log each issued request as pretty JSON at info level.
    #[serde(default)]
    pub log_requests: bool,
}

impl VAtomicConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# vatomic configuration
#
# How versioned updates confirm success:
#   "returned_document" = find_and_modify, compare the returned version (default)
#   "write_counts"      = update_one, require modified_count == 1, then re-read
success_check = "returned_document"

# Echo every CAS request (filter, update, options) at info level.
log_requests = false
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> VAtomicResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VAtomicError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            VAtomicError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> VAtomicResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> VAtomicResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VAtomicError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
