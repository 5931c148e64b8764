//! Error types for temp data property synchronisation
//!
//! - [`SyncError`]: failures surfaced by the filter and its collaborators
//! - [`FieldError`]: a single field could not be read or assigned

use tempdata_store::StoreError;

/// Why a field accessor refused a read or write
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Field cannot represent absence
    #[error("absent value not allowed")]
    AbsentNotAllowed,

    /// Value could not be converted to or from the field's type
    #[error("value conversion failed: {0}")]
    Conversion(#[from] serde_json::Error),
}

/// Accessor failure attributed to a named field
#[derive(Debug, thiserror::Error)]
#[error("temp data field '{field}': {source}")]
pub struct FieldError {
    /// Field name
    pub field: String,

    /// Underlying accessor failure
    #[source]
    pub source: AccessError,
}

impl FieldError {
    /// Attribute `source` to `field`
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, source: AccessError) -> Self {
        Self {
            field: field.into(),
            source,
        }
    }
}

/// Main synchronisation error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Load invoked before field metadata was supplied
    #[error("filter was not correctly initialized with field metadata")]
    NotInitialized,

    /// Store failure, passed through unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Field read or assignment failed
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Two descriptors share a name
    #[error("duplicate temp data field: '{0}'")]
    DuplicateField(String),

    /// Invalid filter configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Cached field metadata does not belong to the requested subject type
    #[error("cached temp data fields do not match subject type '{0}'")]
    MetadataMismatch(&'static str),
}

/// Result type alias for synchronisation operations
pub type SyncResult<T> = Result<T, SyncError>;
