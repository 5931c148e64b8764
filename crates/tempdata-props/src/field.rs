//! Field descriptors and accessors
//!
//! A [`FieldDescriptor`] names one synchronised field on a subject type and
//! carries the narrow get/set capability the filter needs. Whether a field can
//! represent absence is fixed when the descriptor is built, so the filter
//! never inspects types while loading or saving.
//!
//! # Accessor kinds
//! - [`FieldDescriptor::required`]: plain `T`; absence is never assigned
//! - [`FieldDescriptor::optional`]: `Option<T>`; absence assigns `None`
//! - [`FieldDescriptor::defaulted`]: `T: Default`; absence resets to
//!   `T::default()`, and the default reads back as absent

use crate::error::{AccessError, FieldError, SyncError, SyncResult};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tempdata_store::TempValue;

/// Get/set capability for one field of `S`
pub trait FieldAccessor<S>: Send + Sync {
    /// Current value, or `None` when the field holds its absent representation
    ///
    /// # Errors
    /// Returns [`AccessError::Conversion`] if the value cannot be serialised.
    fn get(&self, subject: &S) -> Result<Option<TempValue>, AccessError>;

    /// Assign `value` (or absence) to the field
    ///
    /// # Errors
    /// Returns [`AccessError`] when the value does not fit the field.
    fn set(&self, subject: &mut S, value: Option<TempValue>) -> Result<(), AccessError>;
}

/// Metadata for one synchronised field
pub struct FieldDescriptor<S> {
    name: String,
    allows_absent: bool,
    accessor: Box<dyn FieldAccessor<S>>,
}

impl<S> std::fmt::Debug for FieldDescriptor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("allows_absent", &self.allows_absent)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> FieldDescriptor<S> {
    /// Descriptor over a custom accessor
    #[must_use]
    pub fn custom(
        name: impl Into<String>,
        allows_absent: bool,
        accessor: impl FieldAccessor<S> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            allows_absent,
            accessor: Box::new(accessor),
        }
    }

    /// Non-nullable field of type `T`
    #[must_use]
    pub fn required<T, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&S) -> &T + Send + Sync + 'static,
        M: Fn(&mut S) -> &mut T + Send + Sync + 'static,
    {
        Self::custom(name, false, Required::<S, T, G, M>::new(get, get_mut))
    }

    /// Nullable field of type `Option<T>`
    #[must_use]
    pub fn optional<T, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&S) -> &Option<T> + Send + Sync + 'static,
        M: Fn(&mut S) -> &mut Option<T> + Send + Sync + 'static,
    {
        Self::custom(name, true, Optional::<S, T, G, M>::new(get, get_mut))
    }

    /// Reference-like field whose default value stands for absence
    ///
    /// Absence resets the field to `T::default()`, and a field holding
    /// `T::default()` reads back as absent. A value deliberately set to the
    /// default (`""`, an empty `Vec`) therefore looks unset and is never
    /// written back. Use [`optional`](Self::optional) with `Option<T>` when an
    /// empty value must carry over to the next request.
    #[must_use]
    pub fn defaulted<T, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: Serialize + DeserializeOwned + Default + PartialEq + 'static,
        G: Fn(&S) -> &T + Send + Sync + 'static,
        M: Fn(&mut S) -> &mut T + Send + Sync + 'static,
    {
        Self::custom(name, true, Defaulted::<S, T, G, M>::new(get, get_mut))
    }
}

impl<S> FieldDescriptor<S> {
    /// Field name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether absence may be assigned to this field
    #[inline]
    #[must_use]
    pub fn allows_absent(&self) -> bool {
        self.allows_absent
    }

    /// Read the field's current value
    ///
    /// # Errors
    /// Returns [`FieldError`] naming this field.
    pub fn read(&self, subject: &S) -> Result<Option<TempValue>, FieldError> {
        self.accessor
            .get(subject)
            .map_err(|e| FieldError::new(&self.name, e))
    }

    /// Assign a value (or absence) to the field
    ///
    /// # Errors
    /// Returns [`FieldError`] naming this field.
    pub fn write(&self, subject: &mut S, value: Option<TempValue>) -> Result<(), FieldError> {
        self.accessor
            .set(subject, value)
            .map_err(|e| FieldError::new(&self.name, e))
    }
}

/// Ordered set of descriptors for one subject type, unique by name
pub struct FieldSet<S> {
    fields: IndexMap<String, FieldDescriptor<S>>,
}

impl<S> std::fmt::Debug for FieldSet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.fields.values()).finish()
    }
}

impl<S> FieldSet<S> {
    /// Build a set, preserving declaration order
    ///
    /// # Errors
    /// Returns [`SyncError::DuplicateField`] if two descriptors share a name.
    pub fn new(descriptors: Vec<FieldDescriptor<S>>) -> SyncResult<Self> {
        let mut fields = IndexMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if fields.insert(name.clone(), descriptor).is_some() {
                return Err(SyncError::DuplicateField(name));
            }
        }
        Ok(Self { fields })
    }

    /// Descriptor by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor<S>> {
        self.fields.get(name)
    }

    /// Descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor<S>> {
        self.fields.values()
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn to_temp<T: Serialize>(value: &T) -> Result<TempValue, AccessError> {
    Ok(serde_json::to_value(value)?)
}

fn from_temp<T: DeserializeOwned>(value: TempValue) -> Result<T, AccessError> {
    Ok(serde_json::from_value(value)?)
}

struct Required<S, T, G, M> {
    get: G,
    get_mut: M,
    _marker: PhantomData<fn(&mut S) -> T>,
}

impl<S, T, G, M> Required<S, T, G, M> {
    fn new(get: G, get_mut: M) -> Self {
        Self {
            get,
            get_mut,
            _marker: PhantomData,
        }
    }
}

impl<S, T, G, M> FieldAccessor<S> for Required<S, T, G, M>
where
    T: Serialize + DeserializeOwned,
    G: Fn(&S) -> &T + Send + Sync,
    M: Fn(&mut S) -> &mut T + Send + Sync,
{
    fn get(&self, subject: &S) -> Result<Option<TempValue>, AccessError> {
        to_temp((self.get)(subject)).map(Some)
    }

    fn set(&self, subject: &mut S, value: Option<TempValue>) -> Result<(), AccessError> {
        let value = value.ok_or(AccessError::AbsentNotAllowed)?;
        *(self.get_mut)(subject) = from_temp(value)?;
        Ok(())
    }
}

struct Optional<S, T, G, M> {
    get: G,
    get_mut: M,
    _marker: PhantomData<fn(&mut S) -> T>,
}

impl<S, T, G, M> Optional<S, T, G, M> {
    fn new(get: G, get_mut: M) -> Self {
        Self {
            get,
            get_mut,
            _marker: PhantomData,
        }
    }
}

impl<S, T, G, M> FieldAccessor<S> for Optional<S, T, G, M>
where
    T: Serialize + DeserializeOwned,
    G: Fn(&S) -> &Option<T> + Send + Sync,
    M: Fn(&mut S) -> &mut Option<T> + Send + Sync,
{
    fn get(&self, subject: &S) -> Result<Option<TempValue>, AccessError> {
        (self.get)(subject).as_ref().map(to_temp).transpose()
    }

    fn set(&self, subject: &mut S, value: Option<TempValue>) -> Result<(), AccessError> {
        // JSON null deserialises to None as well
        *(self.get_mut)(subject) = match value {
            Some(value) => from_temp::<Option<T>>(value)?,
            None => None,
        };
        Ok(())
    }
}

struct Defaulted<S, T, G, M> {
    get: G,
    get_mut: M,
    _marker: PhantomData<fn(&mut S) -> T>,
}

impl<S, T, G, M> Defaulted<S, T, G, M> {
    fn new(get: G, get_mut: M) -> Self {
        Self {
            get,
            get_mut,
            _marker: PhantomData,
        }
    }
}

impl<S, T, G, M> FieldAccessor<S> for Defaulted<S, T, G, M>
where
    T: Serialize + DeserializeOwned + Default + PartialEq,
    G: Fn(&S) -> &T + Send + Sync,
    M: Fn(&mut S) -> &mut T + Send + Sync,
{
    fn get(&self, subject: &S) -> Result<Option<TempValue>, AccessError> {
        let value = (self.get)(subject);
        if *value == T::default() {
            return Ok(None);
        }
        to_temp(value).map(Some)
    }

    fn set(&self, subject: &mut S, value: Option<TempValue>) -> Result<(), AccessError> {
        *(self.get_mut)(subject) = match value {
            Some(value) => from_temp(value)?,
            None => T::default(),
        };
        Ok(())
    }
}
