//! Persistence of temp data between requests

use crate::error::StoreResult;
use crate::value::{SessionId, TempValues};
use dashmap::DashMap;

/// Loads and saves a session's temp data
///
/// Implementations decide the storage medium and expiry; the dictionary only
/// relies on `load` returning what the previous `save` handed over.
pub trait TempDataProvider: Send + Sync {
    /// Values left for this session by the previous request
    ///
    /// # Errors
    /// Returns backend-specific failures.
    fn load(&self, session: &SessionId) -> StoreResult<TempValues>;

    /// Values to carry into the session's next request
    ///
    /// # Errors
    /// Returns backend-specific failures.
    fn save(&self, session: &SessionId, values: TempValues) -> StoreResult<()>;
}

/// In-memory provider keyed by session
///
/// `load` takes the session's entry out, so values survive exactly one
/// subsequent request unless saved again.
#[derive(Debug, Default)]
pub struct SessionTempDataProvider {
    sessions: DashMap<SessionId, TempValues>,
}

impl SessionTempDataProvider {
    /// Create empty provider
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Number of sessions holding temp data
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of a session's pending values without consuming them
    #[must_use]
    pub fn pending(&self, session: &SessionId) -> Option<TempValues> {
        self.sessions.get(session).map(|entry| entry.value().clone())
    }
}

impl TempDataProvider for SessionTempDataProvider {
    fn load(&self, session: &SessionId) -> StoreResult<TempValues> {
        Ok(self
            .sessions
            .remove(session)
            .map(|(_, values)| values)
            .unwrap_or_default())
    }

    fn save(&self, session: &SessionId, values: TempValues) -> StoreResult<()> {
        if values.is_empty() {
            self.sessions.remove(session);
        } else {
            self.sessions.insert(session.clone(), values);
        }
        Ok(())
    }
}
