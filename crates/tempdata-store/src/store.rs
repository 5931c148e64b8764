//! The store contract consumed by property synchronisation

use crate::error::StoreResult;
use crate::value::{TempValue, TempValues};
use std::collections::HashMap;

/// Key/value store scoped to the current request's session lineage
///
/// `get` may have side effects on the store's retention bookkeeping (a read
/// can mark an entry for removal), hence `&mut self`.
pub trait TempDataStore {
    /// Read the value stored under `key`, or `None` when absent
    ///
    /// # Errors
    /// Returns the backend's error unchanged.
    fn get(&mut self, key: &str) -> StoreResult<Option<TempValue>>;

    /// Store `value` under `key`
    ///
    /// # Errors
    /// Returns the backend's error unchanged.
    fn set(&mut self, key: &str, value: TempValue) -> StoreResult<()>;
}

impl<T: TempDataStore + ?Sized> TempDataStore for &mut T {
    fn get(&mut self, key: &str) -> StoreResult<Option<TempValue>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: TempValue) -> StoreResult<()> {
        (**self).set(key, value)
    }
}

/// Plain map store: reads never consume
impl TempDataStore for TempValues {
    fn get(&mut self, key: &str) -> StoreResult<Option<TempValue>> {
        Ok(HashMap::get(self, key).cloned())
    }

    fn set(&mut self, key: &str, value: TempValue) -> StoreResult<()> {
        self.insert(key.to_string(), value);
        Ok(())
    }
}
