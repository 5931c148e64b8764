//! Value model shared by stores and providers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single temp data value
///
/// Values are dynamically typed JSON; absence is expressed as `Option::None`
/// by the store, never as an entry.
pub type TempValue = serde_json::Value;

/// The full set of values carried for one session
pub type TempValues = HashMap<String, TempValue>;

/// Identifies one user session lineage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create session id from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
