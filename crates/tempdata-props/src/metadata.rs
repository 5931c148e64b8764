//! Field metadata provider and per-type cache
//!
//! Subject types list their synchronised fields through [`TempDataFields`].
//! [`FieldMetadataCache`] builds that list once per type and shares it across
//! requests.

use crate::error::{SyncError, SyncResult};
use crate::field::{FieldDescriptor, FieldSet};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Subject type with temp data backed fields
pub trait TempDataFields: Sized + 'static {
    /// Eligible fields in declaration order
    fn temp_data_fields() -> Vec<FieldDescriptor<Self>>;
}

/// Descriptor sets keyed by subject type
///
/// Safe to share between concurrent requests; each subject type is described
/// at most once per cache.
#[derive(Debug, Default)]
pub struct FieldMetadataCache {
    entries: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl FieldMetadataCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Descriptor set for `S`, building it on first use
    ///
    /// The set is built without holding a shard lock. When two callers race
    /// on a new type, the first insert wins and both get the stored set.
    ///
    /// # Errors
    /// - [`SyncError::DuplicateField`] if `S` declares a name twice
    /// - [`SyncError::MetadataMismatch`] if the entry under `S` holds another type
    pub fn fields_for<S: TempDataFields>(&self) -> SyncResult<Arc<FieldSet<S>>> {
        let type_id = TypeId::of::<S>();
        let cached = self.entries.get(&type_id).map(|entry| entry.value().clone());

        let entry = match cached {
            Some(entry) => entry,
            None => {
                let fields = FieldSet::new(S::temp_data_fields())?;
                tracing::debug!(
                    subject = std::any::type_name::<S>(),
                    fields = fields.len(),
                    "temp data fields described"
                );
                let built: Arc<dyn Any + Send + Sync> = Arc::new(fields);
                self.entries.entry(type_id).or_insert(built).value().clone()
            }
        };

        entry
            .downcast::<FieldSet<S>>()
            .map_err(|_| SyncError::MetadataMismatch(std::any::type_name::<S>()))
    }

    /// Check if `S` has been described
    #[inline]
    #[must_use]
    pub fn contains<S: TempDataFields>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<S>())
    }

    /// Number of described subject types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
