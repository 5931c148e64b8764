//! Testing utilities for the tempdata workspace
//!
//! Shared subjects, stores and providers for filter tests.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use tempdata_props::{FieldDescriptor, TempDataFields};
use tempdata_store::{
    SessionId, SessionTempDataProvider, StoreError, StoreResult, TempDataProvider, TempDataStore,
    TempValue, TempValues,
};

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
}

/// Subject covering every accessor kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactForm {
    pub message: String,
    pub counter: i32,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub address: Option<Address>,
}

impl TempDataFields for ContactForm {
    fn temp_data_fields() -> Vec<FieldDescriptor<Self>> {
        vec![
            FieldDescriptor::defaulted(
                "Message",
                |f: &ContactForm| &f.message,
                |f: &mut ContactForm| &mut f.message,
            ),
            FieldDescriptor::required(
                "Counter",
                |f: &ContactForm| &f.counter,
                |f: &mut ContactForm| &mut f.counter,
            ),
            FieldDescriptor::optional(
                "Note",
                |f: &ContactForm| &f.note,
                |f: &mut ContactForm| &mut f.note,
            ),
            FieldDescriptor::defaulted(
                "Tags",
                |f: &ContactForm| &f.tags,
                |f: &mut ContactForm| &mut f.tags,
            ),
            FieldDescriptor::optional(
                "Address",
                |f: &ContactForm| &f.address,
                |f: &mut ContactForm| &mut f.address,
            ),
        ]
    }
}

/// Namespaced key for `name` under the default prefix
#[must_use]
pub fn key(name: &str) -> String {
    format!("{}{name}", tempdata_props::DEFAULT_KEY_PREFIX)
}

/// Map store from `(field name, value)` pairs under the default prefix
#[must_use]
pub fn store_with(pairs: &[(&str, TempValue)]) -> TempValues {
    pairs
        .iter()
        .map(|(name, value)| (key(name), value.clone()))
        .collect()
}

/// Map store recording every write
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub values: TempValues,
    pub reads: Vec<String>,
    pub writes: Vec<(String, TempValue)>,
}

impl RecordingStore {
    #[must_use]
    pub fn new(values: TempValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn written_keys(&self) -> Vec<&str> {
        self.writes.iter().map(|(k, _)| k.as_str()).collect()
    }
}

impl TempDataStore for RecordingStore {
    fn get(&mut self, key: &str) -> StoreResult<Option<TempValue>> {
        self.reads.push(key.to_string());
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: TempValue) -> StoreResult<()> {
        self.writes.push((key.to_string(), value.clone()));
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

impl TempDataStore for FailingStore {
    fn get(&mut self, _key: &str) -> StoreResult<Option<TempValue>> {
        Err(StoreError::backend("store offline"))
    }

    fn set(&mut self, _key: &str, _value: TempValue) -> StoreResult<()> {
        Err(StoreError::backend("store offline"))
    }
}

/// Session provider that keeps a log of saved payloads
#[derive(Debug, Default)]
pub struct CountingProvider {
    inner: SessionTempDataProvider,
    saves: Mutex<Vec<TempValues>>,
}

impl CountingProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    #[must_use]
    pub fn last_saved(&self) -> Option<TempValues> {
        self.saves.lock().last().cloned()
    }
}

impl TempDataProvider for CountingProvider {
    fn load(&self, session: &SessionId) -> StoreResult<TempValues> {
        self.inner.load(session)
    }

    fn save(&self, session: &SessionId, values: TempValues) -> StoreResult<()> {
        self.saves.lock().push(values.clone());
        self.inner.save(session, values)
    }
}
