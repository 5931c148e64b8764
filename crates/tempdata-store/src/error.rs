//! Error types for temp data storage

/// Errors raised by a temp data store or its provider
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing storage failed
    #[error("temp data backend error: {0}")]
    Backend(String),

    /// Value could not be (de)serialised by the backend
    #[error("temp data serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create backend error with message
    #[inline]
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
