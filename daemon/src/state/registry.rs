//! Authoritative in-memory hotkey registry
//!
//! Every mutation runs persist -> rebind -> broadcast while holding the
//! per-hotkey lock, so two requests for the same id never interleave.
//! Different ids proceed independently.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::accelerator::{self, AcceleratorError};
use crate::events::Notification;
use crate::hotkey::{Binding, HotkeyConfig, HotkeyId, HotkeySettings, LiveBinder};
use crate::store::SettingsStore;
use crate::sync::{DeliveryReport, SyncHub};

use super::machine::{BindingState, HotkeyMachine};

/// Errors returned by registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid accelerator {accelerator:?}: {reason}")]
    InvalidAccelerator {
        accelerator: String,
        reason: AcceleratorError,
    },

    #[error("registry state lock is poisoned")]
    StatePoisoned,
}

/// What a successful mutation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    pub id: HotkeyId,
    /// Every store write succeeded
    pub persisted: bool,
    /// Binding state after the mutation
    pub binding: BindingState,
    /// Delivery outcome of each broadcast, in publish order
    pub deliveries: Vec<DeliveryReport>,
}

/// Which slice of the snapshot a mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slice {
    Enabled,
    Accelerators,
}

/// Single source of truth for hotkey configuration
pub struct HotkeyRegistry {
    settings: RwLock<HotkeySettings>,
    machines: [AsyncMutex<HotkeyMachine>; 4],
    /// Serializes snapshot-and-publish so windows see commits in order
    publish_lock: Mutex<()>,
    store: Arc<dyn SettingsStore>,
    binder: Arc<dyn LiveBinder>,
    hub: Arc<SyncHub>,
}

impl HotkeyRegistry {
    /// Materialize the registry from the store and push all enabled
    /// bindings to the binder in one batch
    pub async fn load(
        store: Arc<dyn SettingsStore>,
        binder: Arc<dyn LiveBinder>,
        hub: Arc<SyncHub>,
    ) -> Self {
        let settings = read_settings(store.as_ref());
        let mut machines = HotkeyId::ALL.map(|id| AsyncMutex::new(HotkeyMachine::new(id)));

        let bindings: Vec<Binding> = settings
            .iter()
            .filter(|(_, config)| config.enabled)
            .map(|(id, config)| Binding {
                id,
                accelerator: config.accelerator.clone(),
                scope: id.scope(),
            })
            .collect();

        let results = binder.bind_all(&bindings).await;
        for (id, result) in &results {
            if let Err(e) = result {
                warn!(%id, %e, "startup bind failed; hotkey stays enabled but unbound");
            }
            machines[id.index()].get_mut().record_bind(result);
        }

        info!(
            requested = bindings.len(),
            bound = results.iter().filter(|(_, r)| r.is_ok()).count(),
            "hotkey registry loaded"
        );

        Self {
            settings: RwLock::new(settings),
            machines,
            publish_lock: Mutex::new(()),
            store,
            binder,
            hub,
        }
    }

    /// Read-consistent copy of every hotkey's configuration
    pub fn snapshot(&self) -> Result<HotkeySettings, RegistryError> {
        self.settings
            .read()
            .map(|settings| settings.clone())
            .map_err(|_| RegistryError::StatePoisoned)
    }

    /// Like [`snapshot`](Self::snapshot) but total: falls back to defaults
    pub fn get_all(&self) -> HotkeySettings {
        match self.snapshot() {
            Ok(settings) => settings,
            Err(e) => {
                error!(%e, "returning default hotkey settings");
                HotkeySettings::default()
            }
        }
    }

    pub async fn binding_state(&self, id: HotkeyId) -> BindingState {
        self.machines[id.index()].lock().await.state()
    }

    /// Turn a hotkey on or off
    pub async fn set_enabled(&self, id: HotkeyId, enabled: bool) -> MutationReport {
        let mut machine = self.machines[id.index()].lock().await;

        let accelerator = {
            let mut settings = self.write_settings();
            let config = settings.get_mut(id);
            config.enabled = enabled;
            config.accelerator.clone()
        };

        let persisted = self.persist(id.enabled_key(), Value::Bool(enabled));

        let bound = if enabled {
            machine.enable(self.binder.as_ref(), &accelerator).await
        } else {
            machine.disable(self.binder.as_ref()).await
        };
        if let Err(e) = bound {
            warn!(%id, enabled, %e, "live binding not updated");
        }

        let deliveries = vec![self.broadcast(Slice::Enabled)];
        info!(%id, enabled, state = %machine.state(), "hotkey enabled flag updated");

        MutationReport {
            id,
            persisted,
            binding: machine.state(),
            deliveries,
        }
    }

    /// Change a hotkey's accelerator.
    ///
    /// The accelerator is stored in canonical form.
    pub async fn set_accelerator(
        &self,
        id: HotkeyId,
        accelerator: &str,
    ) -> Result<MutationReport, RegistryError> {
        accelerator::check(accelerator).map_err(|reason| RegistryError::InvalidAccelerator {
            accelerator: accelerator.to_string(),
            reason,
        })?;
        let canonical = accelerator::normalize(accelerator);

        let mut machine = self.machines[id.index()].lock().await;

        let (previous, enabled) = {
            let mut settings = self.write_settings();
            let config = settings.get_mut(id);
            let previous = std::mem::replace(&mut config.accelerator, canonical.clone());
            (previous, config.enabled)
        };

        let persisted = self.persist(id.accelerator_key(), Value::String(canonical.clone()));

        // A disabled hotkey may still hold a registration that failed to release
        let bound = if enabled {
            machine.rebind(self.binder.as_ref(), &canonical).await
        } else {
            machine.disable(self.binder.as_ref()).await
        };
        if let Err(e) = bound {
            warn!(%id, accelerator = %canonical, %e, "live binding not updated");
        }

        let deliveries = vec![self.broadcast(Slice::Accelerators)];
        info!(%id, %previous, accelerator = %canonical, state = %machine.state(), "accelerator updated");

        Ok(MutationReport {
            id,
            persisted,
            binding: machine.state(),
            deliveries,
        })
    }

    /// Restore a hotkey's documented default configuration
    pub async fn reset_to_defaults(&self, id: HotkeyId) -> MutationReport {
        let mut machine = self.machines[id.index()].lock().await;
        let HotkeyConfig {
            enabled,
            accelerator,
        } = id.default_config();

        {
            let mut settings = self.write_settings();
            *settings.get_mut(id) = id.default_config();
        }

        let persisted = self.persist(id.enabled_key(), Value::Bool(enabled))
            & self.persist(id.accelerator_key(), Value::String(accelerator.clone()));

        let bound = match (enabled, machine.state().is_enabled()) {
            (true, true) => machine.rebind(self.binder.as_ref(), &accelerator).await,
            (true, false) => machine.enable(self.binder.as_ref(), &accelerator).await,
            (false, _) => machine.disable(self.binder.as_ref()).await,
        };
        if let Err(e) = bound {
            warn!(%id, %e, "live binding not updated after reset");
        }

        let deliveries = vec![
            self.broadcast(Slice::Enabled),
            self.broadcast(Slice::Accelerators),
        ];
        info!(%id, state = %machine.state(), "hotkey reset to defaults");

        MutationReport {
            id,
            persisted,
            binding: machine.state(),
            deliveries,
        }
    }

    /// Write one key; failures are logged and the in-memory update kept
    fn persist(&self, key: &str, value: Value) -> bool {
        match self.store.set(key, value) {
            Ok(()) => {
                debug!(key, "persisted");
                true
            }
            Err(e) => {
                error!(key, %e, "failed to persist hotkey setting; keeping in-memory value");
                false
            }
        }
    }

    fn broadcast(&self, slice: Slice) -> DeliveryReport {
        let _ordered = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let settings = self.get_all();
        let notification = match slice {
            Slice::Enabled => Notification::IndividualSettingsChanged {
                settings: settings.enabled_map(),
            },
            Slice::Accelerators => Notification::AcceleratorsChanged {
                accelerators: settings.accelerator_map(),
            },
        };
        self.hub.publish(&notification)
    }

    fn write_settings(&self) -> RwLockWriteGuard<'_, HotkeySettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read all eight stored fields in one pass, defaulting anything absent,
/// ill-typed or invalid
fn read_settings(store: &dyn SettingsStore) -> HotkeySettings {
    let mut settings = HotkeySettings::default();

    for id in HotkeyId::ALL {
        let config = settings.get_mut(id);

        match store.get(id.enabled_key()) {
            Ok(Some(Value::Bool(enabled))) => config.enabled = enabled,
            Ok(None) => {}
            Ok(Some(other)) => {
                warn!(key = id.enabled_key(), %other, "ignoring non-boolean stored value")
            }
            Err(e) => error!(key = id.enabled_key(), %e, "failed to read stored value"),
        }

        match store.get(id.accelerator_key()) {
            Ok(Some(Value::String(raw))) => match accelerator::check(&raw) {
                Ok(()) => config.accelerator = accelerator::normalize(&raw),
                Err(reason) => {
                    warn!(key = id.accelerator_key(), %raw, %reason, "ignoring invalid stored accelerator")
                }
            },
            Ok(None) => {}
            Ok(Some(other)) => {
                warn!(key = id.accelerator_key(), %other, "ignoring non-string stored value")
            }
            Err(e) => error!(key = id.accelerator_key(), %e, "failed to read stored value"),
        }
    }

    settings
}
