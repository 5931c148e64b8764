//! Resolution of the temp data dictionary for a request

use crate::dictionary::TempDataDictionary;
use crate::error::StoreResult;
use crate::provider::TempDataProvider;
use crate::value::SessionId;
use std::sync::Arc;

/// Per-request state the factory caches the dictionary in
#[derive(Debug)]
pub struct RequestContext {
    session: SessionId,
    temp_data: Option<TempDataDictionary>,
}

impl RequestContext {
    /// Create context for a request in `session`
    #[inline]
    #[must_use]
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            temp_data: None,
        }
    }

    /// Session this request belongs to
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Dictionary if one was already resolved for this request
    #[inline]
    #[must_use]
    pub fn temp_data(&self) -> Option<&TempDataDictionary> {
        self.temp_data.as_ref()
    }
}

/// Resolves one [`TempDataDictionary`] per request
#[derive(Clone)]
pub struct TempDataDictionaryFactory {
    provider: Arc<dyn TempDataProvider>,
}

impl std::fmt::Debug for TempDataDictionaryFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempDataDictionaryFactory").finish_non_exhaustive()
    }
}

impl TempDataDictionaryFactory {
    /// Create factory over `provider`
    #[inline]
    #[must_use]
    pub fn new(provider: Arc<dyn TempDataProvider>) -> Self {
        Self { provider }
    }

    /// Dictionary for this request, loading it on first use
    ///
    /// # Errors
    /// Returns the provider's load error unchanged.
    pub fn get_temp_data<'a>(
        &self,
        ctx: &'a mut RequestContext,
    ) -> StoreResult<&'a mut TempDataDictionary> {
        let dictionary = match ctx.temp_data.take() {
            Some(dictionary) => dictionary,
            None => TempDataDictionary::load(ctx.session.clone(), self.provider.clone())?,
        };
        Ok(ctx.temp_data.insert(dictionary))
    }

    /// Save the request's dictionary, if one was resolved
    ///
    /// # Errors
    /// Returns the provider's save error unchanged.
    pub fn save(&self, ctx: &mut RequestContext) -> StoreResult<()> {
        match ctx.temp_data.as_mut() {
            Some(dictionary) => dictionary.save(),
            None => Ok(()),
        }
    }
}
