//! Property sync filter
//!
//! Loads temp data into a subject's fields before it runs and writes changed
//! fields back once it has finished.
//!
//! # Protocol
//! 1. [`PropertySyncFilter::load`] reads `prefix + name` for every field,
//!    records what it read in the [`Snapshot`] and assigns it to the subject.
//!    Absence is only assigned to fields that can represent it.
//! 2. The subject runs and may mutate its fields.
//! 3. [`PropertySyncFilter::save_changes`] compares each field with its
//!    snapshot entry and writes values that are present and different.
//!
//! A field cleared to absence during the request is not written, so the
//! store keeps its previous entry. Deletions are never propagated.
//!
//! One filter instance serves one request; it is not meant to be shared.

use crate::config::FilterConfig;
use crate::error::{SyncError, SyncResult};
use crate::field::FieldSet;
use crate::metadata::{FieldMetadataCache, TempDataFields};
use indexmap::IndexMap;
use std::sync::Arc;
use tempdata_store::{TempDataStore, TempValue};

/// Lifecycle of a filter within one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// Nothing loaded yet
    #[default]
    Uninitialized,

    /// Fields loaded from the store
    Loaded,

    /// Changes written back (or skipped)
    Saved,
}

/// Values read from the store at load time, by field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    originals: IndexMap<String, Option<TempValue>>,
}

impl Snapshot {
    /// Record the value read for `field`, replacing any earlier entry
    pub fn record(&mut self, field: &str, value: Option<TempValue>) {
        self.originals.insert(field.to_string(), value);
    }

    /// Entry for `field`: outer `None` when unrecorded, inner `None` when the
    /// store had no value
    #[inline]
    #[must_use]
    pub fn original(&self, field: &str) -> Option<Option<&TempValue>> {
        self.originals.get(field).map(Option::as_ref)
    }

    /// Entries in load order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&TempValue>)> {
        self.originals
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// Number of recorded fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// Synchronises a subject's temp data fields for one request
#[derive(Debug)]
pub struct PropertySyncFilter<S> {
    config: Arc<FilterConfig>,
    fields: Option<Arc<FieldSet<S>>>,
    snapshot: Option<Snapshot>,
    state: FilterState,
}

impl<S> PropertySyncFilter<S> {
    /// Create filter without field metadata
    #[inline]
    #[must_use]
    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self {
            config,
            fields: None,
            snapshot: None,
            state: FilterState::Uninitialized,
        }
    }

    /// With the subject type's field set
    #[inline]
    #[must_use]
    pub fn with_fields(mut self, fields: Arc<FieldSet<S>>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Supply the subject type's field set
    #[inline]
    pub fn set_fields(&mut self, fields: Arc<FieldSet<S>>) {
        self.fields = Some(fields);
    }

    /// Field set, if supplied
    #[inline]
    #[must_use]
    pub fn fields(&self) -> Option<&FieldSet<S>> {
        self.fields.as_deref()
    }

    /// Values captured at load time
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Load store values into `subject` and capture a fresh snapshot
    ///
    /// Must run before the subject does.
    ///
    /// # Errors
    /// - [`SyncError::NotInitialized`] when no field set was supplied
    /// - [`SyncError::Store`] when the store fails
    /// - [`SyncError::Field`] when a stored value does not fit its field
    pub fn load(&mut self, store: &mut dyn TempDataStore, subject: &mut S) -> SyncResult<()> {
        let fields = self.fields.clone().ok_or(SyncError::NotInitialized)?;

        if self.state != FilterState::Uninitialized {
            tracing::warn!(state = ?self.state, "temp data filter loaded twice; snapshot reset");
        }

        self.snapshot = Some(Snapshot::default());
        self.apply(store, subject, &fields)
    }

    /// Load store values into `subject` outside of an action
    ///
    /// Same as [`load`](Self::load) except that a missing field set is not an
    /// error and an existing snapshot is extended rather than replaced. Entries
    /// already in the snapshot take the newly read value, so a later save
    /// diffs against it.
    ///
    /// # Errors
    /// - [`SyncError::Store`] when the store fails
    /// - [`SyncError::Field`] when a stored value does not fit its field
    pub fn apply_temp_data_changes(
        &mut self,
        store: &mut dyn TempDataStore,
        subject: &mut S,
    ) -> SyncResult<()> {
        let Some(fields) = self.fields.clone() else {
            return Ok(());
        };
        self.apply(store, subject, &fields)
    }

    fn apply(
        &mut self,
        store: &mut dyn TempDataStore,
        subject: &mut S,
        fields: &FieldSet<S>,
    ) -> SyncResult<()> {
        let snapshot = self.snapshot.get_or_insert_with(Snapshot::default);

        for field in fields.iter() {
            let value = store.get(&self.config.key_for(field.name()))?;
            snapshot.record(field.name(), value.clone());

            if value.is_some() || field.allows_absent() {
                field.write(subject, value)?;
            } else {
                tracing::trace!(field = field.name(), "absent value skipped for non-nullable field");
            }
        }

        tracing::debug!(fields = fields.len(), "temp data properties loaded");
        self.state = FilterState::Loaded;
        Ok(())
    }

    /// Write fields that changed since load back to the store
    ///
    /// Does nothing when there is no subject or nothing was loaded. Returns
    /// the number of entries written. The state only moves to
    /// [`FilterState::Saved`] once every changed field was written.
    ///
    /// # Errors
    /// - [`SyncError::Store`] when the store fails
    /// - [`SyncError::Field`] when a field cannot be read
    pub fn save_changes(
        &mut self,
        store: &mut dyn TempDataStore,
        subject: Option<&S>,
    ) -> SyncResult<usize> {
        let (Some(subject), Some(snapshot), Some(fields)) =
            (subject, self.snapshot.as_ref(), self.fields.as_deref())
        else {
            tracing::trace!("temp data save skipped; nothing loaded");
            self.state = FilterState::Saved;
            return Ok(0);
        };

        let mut written = 0;
        for (name, original) in snapshot.iter() {
            let Some(field) = fields.get(name) else {
                continue;
            };

            match field.read(subject)? {
                Some(current) if original != Some(&current) => {
                    tracing::trace!(field = name, "temp data property changed");
                    store.set(&self.config.key_for(name), current)?;
                    written += 1;
                }
                _ => {}
            }
        }

        tracing::debug!(written, "temp data properties saved");
        self.state = FilterState::Saved;
        Ok(written)
    }
}

/// Builds one initialised filter per request
#[derive(Debug, Clone, Default)]
pub struct PropertySyncFilterFactory {
    config: Arc<FilterConfig>,
    cache: Arc<FieldMetadataCache>,
}

impl PropertySyncFilterFactory {
    /// Create factory
    #[inline]
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(FieldMetadataCache::new()),
        }
    }

    /// With a shared metadata cache
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<FieldMetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Metadata cache in use
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &FieldMetadataCache {
        &self.cache
    }

    /// Fresh filter for a subject of type `S`
    ///
    /// # Errors
    /// Returns [`SyncError::DuplicateField`] if `S` declares a name twice.
    pub fn create<S: TempDataFields>(&self) -> SyncResult<PropertySyncFilter<S>> {
        let fields = self.cache.fields_for::<S>()?;
        Ok(PropertySyncFilter::new(self.config.clone()).with_fields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempdata_store::TempValues;

    #[derive(Debug, Default)]
    struct Model {
        message: String,
        counter: i32,
        note: Option<String>,
    }

    impl TempDataFields for Model {
        fn temp_data_fields() -> Vec<FieldDescriptor<Self>> {
            vec![
                FieldDescriptor::defaulted(
                    "Message",
                    |m: &Model| &m.message,
                    |m: &mut Model| &mut m.message,
                ),
                FieldDescriptor::required(
                    "Counter",
                    |m: &Model| &m.counter,
                    |m: &mut Model| &mut m.counter,
                ),
                FieldDescriptor::optional("Note", |m: &Model| &m.note, |m: &mut Model| &mut m.note),
            ]
        }
    }

    fn filter() -> PropertySyncFilter<Model> {
        PropertySyncFilterFactory::default().create::<Model>().unwrap()
    }

    fn store(pairs: &[(&str, TempValue)]) -> TempValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn new_filter_is_uninitialized() {
        let filter = PropertySyncFilter::<Model>::new(Arc::new(FilterConfig::default()));
        assert_eq!(filter.state(), FilterState::Uninitialized);
        assert!(filter.fields().is_none());
        assert!(filter.snapshot().is_none());
    }

    #[test]
    fn load_without_fields_fails() {
        let mut filter = PropertySyncFilter::<Model>::new(Arc::new(FilterConfig::default()));
        let mut store = TempValues::new();
        let mut model = Model::default();

        let err = filter.load(&mut store, &mut model).unwrap_err();
        assert!(matches!(err, SyncError::NotInitialized));
        assert_eq!(filter.state(), FilterState::Uninitialized);
    }

    #[test]
    fn load_assigns_values_and_records_snapshot() {
        let mut filter = filter();
        let mut store = store(&[
            ("TempDataProperty-Message", json!("hello")),
            ("TempDataProperty-Counter", json!(4)),
        ]);
        let mut model = Model::default();

        filter.load(&mut store, &mut model).unwrap();

        assert_eq!(model.message, "hello");
        assert_eq!(model.counter, 4);
        assert_eq!(model.note, None);

        let snapshot = filter.snapshot().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.original("Message"), Some(Some(&json!("hello"))));
        assert_eq!(snapshot.original("Note"), Some(None));
        assert_eq!(filter.state(), FilterState::Loaded);
    }

    #[test]
    fn load_skips_absence_for_required_fields() {
        let mut filter = filter();
        let mut store = TempValues::new();
        let mut model = Model {
            counter: 9,
            note: Some("stale".to_string()),
            message: "stale".to_string(),
        };

        filter.load(&mut store, &mut model).unwrap();

        assert_eq!(model.counter, 9);
        assert_eq!(model.note, None);
        assert_eq!(model.message, "");
    }

    #[test]
    fn load_reports_conversion_failure() {
        let mut filter = filter();
        let mut store = store(&[("TempDataProperty-Counter", json!("many"))]);
        let mut model = Model::default();

        let err = filter.load(&mut store, &mut model).unwrap_err();
        assert!(matches!(err, SyncError::Field(ref e) if e.field == "Counter"));
    }

    #[test]
    fn save_writes_only_changed_fields() {
        let mut filter = filter();
        let mut store = store(&[("TempDataProperty-Message", json!("hello"))]);
        let mut model = Model::default();

        filter.load(&mut store, &mut model).unwrap();
        model.counter = 5;

        let written = filter.save_changes(&mut store, Some(&model)).unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            store,
            self::store(&[
                ("TempDataProperty-Message", json!("hello")),
                ("TempDataProperty-Counter", json!(5)),
            ])
        );
        assert_eq!(filter.state(), FilterState::Saved);
    }

    #[test]
    fn save_does_not_propagate_clears() {
        let mut filter = filter();
        let mut store = store(&[("TempDataProperty-Note", json!("keep me"))]);
        let mut model = Model::default();

        filter.load(&mut store, &mut model).unwrap();
        model.note = None;

        assert_eq!(filter.save_changes(&mut store, Some(&model)).unwrap(), 0);
        assert_eq!(store.get("TempDataProperty-Note"), Some(&json!("keep me")));
    }

    #[test]
    fn save_without_load_is_noop() {
        let mut filter = filter();
        let mut store = TempValues::new();
        let model = Model {
            counter: 3,
            ..Model::default()
        };

        assert_eq!(filter.save_changes(&mut store, Some(&model)).unwrap(), 0);
        assert!(store.is_empty());
        assert_eq!(filter.state(), FilterState::Saved);
    }

    #[test]
    fn save_without_subject_is_noop() {
        let mut filter = filter();
        let mut store = TempValues::new();
        let mut model = Model::default();

        filter.load(&mut store, &mut model).unwrap();
        model.counter = 1;

        assert_eq!(filter.save_changes(&mut store, None).unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn reload_resets_snapshot() {
        let mut filter = filter();
        let mut model = Model::default();

        let mut first = store(&[("TempDataProperty-Counter", json!(1))]);
        filter.load(&mut first, &mut model).unwrap();

        let mut second = TempValues::new();
        filter.load(&mut second, &mut model).unwrap();

        assert_eq!(filter.snapshot().unwrap().original("Counter"), Some(None));
    }

    #[test]
    fn apply_changes_without_fields_is_noop() {
        let mut filter = PropertySyncFilter::<Model>::new(Arc::new(FilterConfig::default()));
        let mut store = store(&[("TempDataProperty-Counter", json!(2))]);
        let mut model = Model::default();

        filter.apply_temp_data_changes(&mut store, &mut model).unwrap();

        assert_eq!(model.counter, 0);
        assert!(filter.snapshot().is_none());
    }

    #[test]
    fn apply_changes_loads_and_enables_save() {
        let mut filter = filter();
        let mut store = store(&[("TempDataProperty-Counter", json!(2))]);
        let mut model = Model::default();

        filter.apply_temp_data_changes(&mut store, &mut model).unwrap();
        assert_eq!(model.counter, 2);

        model.counter = 3;
        assert_eq!(filter.save_changes(&mut store, Some(&model)).unwrap(), 1);
        assert_eq!(store.get("TempDataProperty-Counter"), Some(&json!(3)));
    }

    #[test]
    fn apply_changes_after_load_refreshes_originals() {
        let mut filter = filter();
        let mut model = Model::default();

        let mut first = store(&[
            ("TempDataProperty-Counter", json!(1)),
            ("TempDataProperty-Note", json!("first")),
        ]);
        filter.load(&mut first, &mut model).unwrap();

        let mut second = store(&[("TempDataProperty-Counter", json!(2))]);
        filter.apply_temp_data_changes(&mut second, &mut model).unwrap();

        let snapshot = filter.snapshot().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.original("Counter"), Some(Some(&json!(2))));
        assert_eq!(snapshot.original("Note"), Some(None));
        assert_eq!(model.counter, 2);
        assert_eq!(model.note, None);

        assert_eq!(filter.save_changes(&mut second, Some(&model)).unwrap(), 0);

        model.counter = 3;
        assert_eq!(filter.save_changes(&mut second, Some(&model)).unwrap(), 1);
        assert_eq!(second.get("TempDataProperty-Counter"), Some(&json!(3)));
    }

    #[test]
    fn failed_save_leaves_filter_loaded() {
        struct Offline;

        impl TempDataStore for Offline {
            fn get(&mut self, _key: &str) -> tempdata_store::StoreResult<Option<TempValue>> {
                Ok(None)
            }

            fn set(&mut self, _key: &str, _value: TempValue) -> tempdata_store::StoreResult<()> {
                Err(tempdata_store::StoreError::backend("offline"))
            }
        }

        let mut filter = filter();
        let mut model = Model::default();
        filter.load(&mut Offline, &mut model).unwrap();
        model.counter = 4;

        let err = filter.save_changes(&mut Offline, Some(&model)).unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(filter.state(), FilterState::Loaded);
    }

    #[test]
    fn value_reset_to_default_is_not_written() {
        let mut filter = filter();
        let mut store = store(&[
            ("TempDataProperty-Message", json!("x")),
            ("TempDataProperty-Counter", json!(0)),
            ("TempDataProperty-Note", json!("x")),
        ]);
        let mut model = Model::default();

        filter.load(&mut store, &mut model).unwrap();
        model.message = String::new();
        model.note = Some(String::new());

        assert_eq!(filter.save_changes(&mut store, Some(&model)).unwrap(), 1);
        assert_eq!(store.get("TempDataProperty-Message"), Some(&json!("x")));
        assert_eq!(store.get("TempDataProperty-Note"), Some(&json!("")));
    }

    #[test]
    fn custom_prefix_namespaces_keys() {
        let factory = PropertySyncFilterFactory::new(FilterConfig::new().with_key_prefix("Carry."));
        let mut filter = factory.create::<Model>().unwrap();
        let mut store = store(&[("Carry.Counter", json!(8))]);
        let mut model = Model::default();

        filter.load(&mut store, &mut model).unwrap();
        assert_eq!(model.counter, 8);
    }

    #[test]
    fn factory_shares_field_sets() {
        let factory = PropertySyncFilterFactory::default();
        let a = factory.create::<Model>().unwrap();
        let b = factory.create::<Model>().unwrap();
        assert_eq!(factory.cache().len(), 1);
        assert_eq!(a.fields().unwrap().len(), b.fields().unwrap().len());
    }
}
