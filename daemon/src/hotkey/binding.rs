//! Live (OS-level) hotkey bindings
//!
//! The registry drives a [`LiveBinder`] whenever a hotkey's effective
//! binding changes. The OS shortcut API sits behind this trait.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::types::{HotkeyId, Scope};
use crate::accelerator;

/// Boxed future returned by binder operations
pub type BindFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by a live binder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("accelerator {accelerator} is already claimed by {owner}")]
    AlreadyClaimed { accelerator: String, owner: String },

    #[error("binding rejected: {0}")]
    Rejected(String),

    #[error("hotkey {0} is not registered")]
    NotRegistered(HotkeyId),
}

/// One entry of a batched bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub id: HotkeyId,
    pub accelerator: String,
    pub scope: Scope,
}

/// OS-level shortcut (de)registration.
///
/// After `bind(id, ..)` succeeds the binder must no longer hold any earlier
/// accelerator for the same id.
pub trait LiveBinder: Send + Sync {
    fn bind<'a>(
        &'a self,
        id: HotkeyId,
        accelerator: &'a str,
        scope: Scope,
    ) -> BindFuture<'a, Result<(), BindError>>;

    fn unbind(&self, id: HotkeyId) -> BindFuture<'_, Result<(), BindError>>;

    /// Bind several hotkeys in one push, reporting each outcome
    fn bind_all<'a>(
        &'a self,
        bindings: &'a [Binding],
    ) -> BindFuture<'a, Vec<(HotkeyId, Result<(), BindError>)>> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let result = self
                    .bind(binding.id, &binding.accelerator, binding.scope)
                    .await;
                results.push((binding.id, result));
            }
            results
        })
    }
}

/// In-process binder that tracks registrations and refuses conflicts.
///
/// Two hotkeys may not hold the same accelerator at once, whatever their
/// scope.
#[derive(Debug, Default)]
pub struct TrackingBinder {
    active: Mutex<HashMap<HotkeyId, (String, Scope)>>,
}

impl TrackingBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently registered accelerator for `id`
    #[cfg(test)]
    pub fn active(&self, id: HotkeyId) -> Option<String> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.get(&id).map(|(accelerator, _)| accelerator.clone())
    }

    fn register(&self, id: HotkeyId, accelerator: &str, scope: Scope) -> Result<(), BindError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        let wanted = accelerator::normalize(accelerator);
        let conflict = active.iter().find(|(other, (claimed, _))| {
            **other != id && accelerator::normalize(claimed).eq_ignore_ascii_case(&wanted)
        });
        if let Some((owner, _)) = conflict {
            return Err(BindError::AlreadyClaimed {
                accelerator: accelerator.to_string(),
                owner: owner.to_string(),
            });
        }

        if let Some((previous, _)) = active.insert(id, (accelerator.to_string(), scope)) {
            debug!(%id, %previous, "replaced previous registration");
        }
        Ok(())
    }
}

impl LiveBinder for TrackingBinder {
    fn bind<'a>(
        &'a self,
        id: HotkeyId,
        accelerator: &'a str,
        scope: Scope,
    ) -> BindFuture<'a, Result<(), BindError>> {
        Box::pin(async move {
            match self.register(id, accelerator, scope) {
                Ok(()) => {
                    info!(%id, accelerator, ?scope, "hotkey bound");
                    Ok(())
                }
                Err(e) => {
                    warn!(%id, accelerator, %e, "hotkey bind refused");
                    Err(e)
                }
            }
        })
    }

    fn unbind(&self, id: HotkeyId) -> BindFuture<'_, Result<(), BindError>> {
        Box::pin(async move {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            match active.remove(&id) {
                Some((accelerator, _)) => {
                    info!(%id, %accelerator, "hotkey unbound");
                    Ok(())
                }
                None => Err(BindError::NotRegistered(id)),
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording binder for registry tests

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum BinderCall {
        Bind(HotkeyId, String),
        Unbind(HotkeyId),
        BindAll(usize),
    }

    /// Records every call and tracks how many registrations exist at once
    #[derive(Debug, Default)]
    pub struct RecordingBinder {
        inner: TrackingBinder,
        calls: Mutex<Vec<BinderCall>>,
        refuse: Mutex<Vec<String>>,
        fail_unbinds: Mutex<bool>,
        peak_per_id: Mutex<HashMap<HotkeyId, usize>>,
    }

    impl RecordingBinder {
        pub fn calls(&self) -> Vec<BinderCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.calls.lock().unwrap().clear();
        }

        /// Make every later bind of `accelerator` fail
        pub fn refuse(&self, accelerator: &str) {
            self.refuse.lock().unwrap().push(accelerator.to_string());
        }

        /// Make unbinds fail while leaving the registration in place
        pub fn fail_unbinds(&self, fail: bool) {
            *self.fail_unbinds.lock().unwrap() = fail;
        }

        pub fn active(&self, id: HotkeyId) -> Option<String> {
            self.inner.active(id)
        }

        /// Highest number of registrations ever held for `id` at once
        pub fn peak(&self, id: HotkeyId) -> usize {
            self.peak_per_id.lock().unwrap().get(&id).copied().unwrap_or(0)
        }
    }

    impl LiveBinder for RecordingBinder {
        fn bind<'a>(
            &'a self,
            id: HotkeyId,
            accelerator: &'a str,
            scope: Scope,
        ) -> BindFuture<'a, Result<(), BindError>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(BinderCall::Bind(id, accelerator.to_string()));
                if self.refuse.lock().unwrap().iter().any(|a| a == accelerator) {
                    return Err(BindError::Rejected(accelerator.to_string()));
                }
                // Count an existing registration plus the new one before replacing
                let held = usize::from(self.inner.active(id).is_some()) + 1;
                {
                    let mut peak = self.peak_per_id.lock().unwrap();
                    let entry = peak.entry(id).or_insert(0);
                    *entry = (*entry).max(held);
                }
                self.inner.bind(id, accelerator, scope).await
            })
        }

        fn unbind(&self, id: HotkeyId) -> BindFuture<'_, Result<(), BindError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(BinderCall::Unbind(id));
                if *self.fail_unbinds.lock().unwrap() {
                    return Err(BindError::Rejected(format!("unbind of {} refused", id)));
                }
                self.inner.unbind(id).await
            })
        }

        fn bind_all<'a>(
            &'a self,
            bindings: &'a [Binding],
        ) -> BindFuture<'a, Vec<(HotkeyId, Result<(), BindError>)>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(BinderCall::BindAll(bindings.len()));
                let mut results = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    let result = self.inner.register(binding.id, &binding.accelerator, binding.scope);
                    results.push((binding.id, result));
                }
                results
            })
        }
    }
}
