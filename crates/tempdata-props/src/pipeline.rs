//! Request pipeline hooks
//!
//! The filter participates in two phases of a request: before the subject
//! runs ([`ActionFilter`]) and while temp data is being finalised
//! ([`SaveTempDataCallback`]). [`ActionInvoker`] drives both phases in the
//! required order, including requests that never run a subject.

use crate::error::{SyncError, SyncResult};
use crate::filter::PropertySyncFilter;
use tempdata_store::{RequestContext, TempDataDictionary, TempDataDictionaryFactory, TempDataStore};

/// Hooks around subject execution
pub trait ActionFilter<S> {
    /// Runs before the subject
    ///
    /// # Errors
    /// Implementation-specific; aborts the request.
    fn on_action_executing(&mut self, store: &mut dyn TempDataStore, subject: &mut S)
        -> SyncResult<()>;

    /// Runs after the subject
    ///
    /// # Errors
    /// Implementation-specific; aborts the request.
    fn on_action_executed(&mut self, store: &mut dyn TempDataStore, subject: &mut S)
        -> SyncResult<()>;
}

/// Hook invoked while temp data is finalised for the response
pub trait SaveTempDataCallback<S> {
    /// Contribute entries to the store before it is saved
    ///
    /// `subject` is `None` when the request never ran one.
    ///
    /// # Errors
    /// Implementation-specific; aborts the save.
    fn on_temp_data_saving(
        &mut self,
        store: &mut dyn TempDataStore,
        subject: Option<&S>,
    ) -> SyncResult<()>;
}

impl<S> ActionFilter<S> for PropertySyncFilter<S> {
    fn on_action_executing(
        &mut self,
        store: &mut dyn TempDataStore,
        subject: &mut S,
    ) -> SyncResult<()> {
        self.load(store, subject)
    }

    fn on_action_executed(
        &mut self,
        _store: &mut dyn TempDataStore,
        _subject: &mut S,
    ) -> SyncResult<()> {
        Ok(())
    }
}

impl<S> SaveTempDataCallback<S> for PropertySyncFilter<S> {
    fn on_temp_data_saving(
        &mut self,
        store: &mut dyn TempDataStore,
        subject: Option<&S>,
    ) -> SyncResult<()> {
        self.save_changes(store, subject).map(|_| ())
    }
}

/// Runs one request through the temp data hooks
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    factory: TempDataDictionaryFactory,
}

impl ActionInvoker {
    /// Create invoker resolving temp data through `factory`
    #[inline]
    #[must_use]
    pub fn new(factory: TempDataDictionaryFactory) -> Self {
        Self { factory }
    }

    /// Execute `action` on `subject` with `filter` around it
    ///
    /// Order: executing hook, action, executed hook, saving hook, dictionary
    /// save. With no subject only the saving hook and the dictionary save
    /// run. Returns the action's output when it ran.
    ///
    /// The saving hook and the dictionary save run even when an earlier hook
    /// fails, so unread entries stay pending. A failed executing hook skips
    /// the action and the saving hook sees no subject.
    ///
    /// # Errors
    /// Returns the first hook or store failure, after finalisation has run.
    pub fn invoke<S, F, A, R>(
        &self,
        ctx: &mut RequestContext,
        filter: &mut F,
        mut subject: Option<&mut S>,
        action: A,
    ) -> SyncResult<Option<R>>
    where
        F: ActionFilter<S> + SaveTempDataCallback<S>,
        A: FnOnce(&mut S, &mut TempDataDictionary) -> R,
    {
        let session = ctx.session().clone();
        let temp_data = self.factory.get_temp_data(ctx)?;
        let mut failure = None;

        let output = match subject.as_deref_mut() {
            Some(subject) => match filter.on_action_executing(&mut *temp_data, subject) {
                Ok(()) => {
                    let output = action(&mut *subject, &mut *temp_data);
                    if let Err(err) = filter.on_action_executed(&mut *temp_data, subject) {
                        failure = Some(err);
                    }
                    Some(output)
                }
                Err(err) => {
                    tracing::warn!(session = %session, error = %err, "action skipped");
                    failure = Some(err);
                    None
                }
            },
            None => {
                tracing::debug!(session = %session, "request short-circuited");
                None
            }
        };

        let ran = output.is_some();
        let saving = filter.on_temp_data_saving(temp_data, subject.as_deref().filter(|_| ran));
        let stored = self.factory.save(ctx).map_err(SyncError::from);

        match failure.or(saving.err()).or(stored.err()) {
            Some(err) => Err(err),
            None => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempdata_store::{SessionId, SessionTempDataProvider, TempDataProvider, TempValues};

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        saw_subject: Option<bool>,
        reject_executing: bool,
    }

    impl ActionFilter<u32> for Recorder {
        fn on_action_executing(
            &mut self,
            _store: &mut dyn TempDataStore,
            _subject: &mut u32,
        ) -> SyncResult<()> {
            self.calls.push("executing");
            if self.reject_executing {
                return Err(SyncError::Config("rejected".to_string()));
            }
            Ok(())
        }

        fn on_action_executed(
            &mut self,
            _store: &mut dyn TempDataStore,
            _subject: &mut u32,
        ) -> SyncResult<()> {
            self.calls.push("executed");
            Ok(())
        }
    }

    impl SaveTempDataCallback<u32> for Recorder {
        fn on_temp_data_saving(
            &mut self,
            store: &mut dyn TempDataStore,
            subject: Option<&u32>,
        ) -> SyncResult<()> {
            self.calls.push("saving");
            self.saw_subject = Some(subject.is_some());
            store.set("recorded", json!(true))?;
            Ok(())
        }
    }

    fn invoker() -> (ActionInvoker, Arc<SessionTempDataProvider>) {
        let provider = Arc::new(SessionTempDataProvider::new());
        let factory = TempDataDictionaryFactory::new(provider.clone());
        (ActionInvoker::new(factory), provider)
    }

    #[test]
    fn hooks_run_in_order() {
        let (invoker, provider) = invoker();
        let session = SessionId::new("s");
        let mut ctx = RequestContext::new(session.clone());
        let mut recorder = Recorder::default();
        let mut subject = 1_u32;

        let output = invoker
            .invoke(&mut ctx, &mut recorder, Some(&mut subject), |s, _| {
                *s += 1;
                "done"
            })
            .unwrap();

        assert_eq!(output, Some("done"));
        assert_eq!(subject, 2);
        assert_eq!(recorder.calls, vec!["executing", "executed", "saving"]);
        assert_eq!(recorder.saw_subject, Some(true));
        assert!(provider.pending(&session).unwrap().contains_key("recorded"));
    }

    #[test]
    fn short_circuit_still_saves() {
        let (invoker, provider) = invoker();
        let session = SessionId::new("s");
        let mut ctx = RequestContext::new(session.clone());
        let mut recorder = Recorder::default();

        let output = invoker
            .invoke(&mut ctx, &mut recorder, None::<&mut u32>, |_, _| ())
            .unwrap();

        assert_eq!(output, None);
        assert_eq!(recorder.calls, vec!["saving"]);
        assert_eq!(recorder.saw_subject, Some(false));
        assert!(provider.pending(&session).is_some());
    }

    #[test]
    fn failed_executing_hook_still_saves() {
        let (invoker, provider) = invoker();
        let session = SessionId::new("s");
        let mut pending = TempValues::new();
        pending.insert("unrelated".to_string(), json!("keep me"));
        provider.save(&session, pending).unwrap();

        let mut ctx = RequestContext::new(session.clone());
        let mut recorder = Recorder {
            reject_executing: true,
            ..Recorder::default()
        };
        let mut subject = 1_u32;
        let mut ran = false;

        let err = invoker
            .invoke(&mut ctx, &mut recorder, Some(&mut subject), |_, _| ran = true)
            .unwrap_err();

        assert!(matches!(err, SyncError::Config(_)));
        assert!(!ran);
        assert_eq!(recorder.calls, vec!["executing", "saving"]);
        assert_eq!(recorder.saw_subject, Some(false));

        let pending = provider.pending(&session).unwrap();
        assert_eq!(pending.get("unrelated"), Some(&json!("keep me")));
        assert!(pending.contains_key("recorded"));
    }
}
