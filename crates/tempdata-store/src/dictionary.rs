//! Request-scoped temp data dictionary
//!
//! Provides [`TempDataDictionary`], the store handed to request handlers.
//!
//! # Retention rules
//! - A value loaded from the provider and read through [`TempDataStore::get`]
//!   is dropped when the dictionary is saved, unless kept.
//! - [`TempDataDictionary::peek`] reads without marking.
//! - Values written during the request are always retained.
//! - Loaded values that were never read are retained.

use crate::error::StoreResult;
use crate::provider::TempDataProvider;
use crate::store::TempDataStore;
use crate::value::{SessionId, TempValue, TempValues};
use std::collections::HashSet;
use std::sync::Arc;

/// Provider binding used when the dictionary is saved
#[derive(Clone)]
struct Backing {
    session: SessionId,
    provider: Arc<dyn TempDataProvider>,
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backing")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Temp data for one request
#[derive(Debug, Clone, Default)]
pub struct TempDataDictionary {
    data: TempValues,

    /// Loaded keys not yet read; these survive save
    initial_keys: HashSet<String>,

    /// Keys explicitly kept or written during this request
    retained_keys: HashSet<String>,

    backing: Option<Backing>,
}

impl TempDataDictionary {
    /// Create a detached dictionary over `values`
    ///
    /// Saving a detached dictionary only applies the retention rules.
    #[must_use]
    pub fn from_values(values: TempValues) -> Self {
        let initial_keys = values.keys().cloned().collect();
        Self {
            data: values,
            initial_keys,
            retained_keys: HashSet::new(),
            backing: None,
        }
    }

    /// Load the session's values from `provider`
    ///
    /// # Errors
    /// Returns the provider's error unchanged.
    pub fn load(session: SessionId, provider: Arc<dyn TempDataProvider>) -> StoreResult<Self> {
        let values = provider.load(&session)?;
        tracing::debug!(session = %session, entries = values.len(), "temp data loaded");

        let mut dictionary = Self::from_values(values);
        dictionary.backing = Some(Backing { session, provider });
        Ok(dictionary)
    }

    /// Read a value without marking it for removal
    #[inline]
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&TempValue> {
        self.data.get(key)
    }

    /// Retain every current entry for the next request
    pub fn keep(&mut self) {
        self.retained_keys.clear();
        self.retained_keys.extend(self.data.keys().cloned());
    }

    /// Retain a single entry for the next request
    pub fn keep_key(&mut self, key: &str) {
        self.retained_keys.insert(key.to_string());
    }

    /// Remove an entry, returning its value
    pub fn remove(&mut self, key: &str) -> Option<TempValue> {
        self.retained_keys.remove(key);
        self.initial_keys.remove(key);
        self.data.remove(key)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.data.clear();
        self.retained_keys.clear();
        self.initial_keys.clear();
    }

    /// Check if an entry exists (does not mark it)
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over entry keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Apply retention rules and persist the survivors
    ///
    /// # Errors
    /// Returns the provider's error unchanged.
    pub fn save(&mut self) -> StoreResult<()> {
        let initial = &self.initial_keys;
        let retained = &self.retained_keys;
        self.data
            .retain(|key, _| initial.contains(key) || retained.contains(key));

        if let Some(backing) = &self.backing {
            tracing::debug!(
                session = %backing.session,
                entries = self.data.len(),
                "temp data saved"
            );
            backing.provider.save(&backing.session, self.data.clone())?;
        }
        Ok(())
    }

    /// Entries as they stand right now
    #[inline]
    #[must_use]
    pub fn values(&self) -> &TempValues {
        &self.data
    }
}

impl TempDataStore for TempDataDictionary {
    fn get(&mut self, key: &str) -> StoreResult<Option<TempValue>> {
        let value = self.data.get(key).cloned();
        if value.is_some() {
            self.initial_keys.remove(key);
        }
        Ok(value)
    }

    fn set(&mut self, key: &str, value: TempValue) -> StoreResult<()> {
        self.data.insert(key.to_string(), value);
        self.retained_keys.insert(key.to_string());
        Ok(())
    }
}
