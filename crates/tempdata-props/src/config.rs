//! Filter configuration

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// Store key prefix shared with every reader of property temp data
pub const DEFAULT_KEY_PREFIX: &str = "TempDataProperty-";

/// Property sync filter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Prefix namespacing property entries in the store
    pub key_prefix: String,
}

impl FilterConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a custom key prefix
    #[inline]
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Parse configuration from TOML text
    ///
    /// Missing keys fall back to defaults.
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] on malformed TOML or an invalid value.
    pub fn from_toml_str(text: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check configuration invariants
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] when the prefix is empty.
    pub fn validate(&self) -> SyncResult<()> {
        if self.key_prefix.is_empty() {
            return Err(SyncError::Config("key_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Store key for field `name`
    #[inline]
    #[must_use]
    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}
