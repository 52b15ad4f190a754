//! Per-hotkey binding state machine
//!
//! Tracks whether a hotkey is disabled, enabled but not registered with the
//! OS, or enabled and registered, and drives the binder on transitions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accelerator;
use crate::hotkey::{BindError, HotkeyId, LiveBinder};

/// The three possible states of a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingState {
    /// Preference is off, nothing registered
    Disabled,
    /// Preference is on but the OS refused (or was never asked for) the binding
    EnabledUnbound,
    /// Preference is on and the accelerator is registered
    EnabledBound,
}

impl Default for BindingState {
    fn default() -> Self {
        Self::Disabled
    }
}

impl BindingState {
    pub fn is_enabled(self) -> bool {
        !matches!(self, BindingState::Disabled)
    }
}

impl std::fmt::Display for BindingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingState::Disabled => write!(f, "Disabled"),
            BindingState::EnabledUnbound => write!(f, "EnabledUnbound"),
            BindingState::EnabledBound => write!(f, "EnabledBound"),
        }
    }
}

/// Binding state of a single hotkey
#[derive(Debug)]
pub struct HotkeyMachine {
    id: HotkeyId,
    state: BindingState,
    /// An earlier registration failed to release and may still be live
    stale: bool,
}

impl HotkeyMachine {
    pub fn new(id: HotkeyId) -> Self {
        Self {
            id,
            state: BindingState::Disabled,
            stale: false,
        }
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    /// Record the outcome of a bind made outside the machine (batched startup push)
    pub fn record_bind(&mut self, result: &Result<(), BindError>) {
        let next = match result {
            Ok(()) => BindingState::EnabledBound,
            Err(_) => BindingState::EnabledUnbound,
        };
        self.transition_to(next);
    }

    /// Turn the hotkey on and register `accelerator`
    pub async fn enable(
        &mut self,
        binder: &dyn LiveBinder,
        accelerator: &str,
    ) -> Result<(), BindError> {
        if self.state == BindingState::EnabledBound {
            return Ok(());
        }
        self.bind(binder, accelerator).await
    }

    /// Turn the hotkey off, releasing any registration.
    ///
    /// If the binder refuses to release a live registration the machine
    /// stays `EnabledBound`, and the next disable retries.
    pub async fn disable(&mut self, binder: &dyn LiveBinder) -> Result<(), BindError> {
        if self.state == BindingState::EnabledBound || self.stale {
            if let Err(e) = self.release(binder).await {
                if self.state != BindingState::EnabledBound {
                    self.transition_to(BindingState::Disabled);
                }
                return Err(e);
            }
        }
        self.transition_to(BindingState::Disabled);
        Ok(())
    }

    /// Swap the registered accelerator.
    ///
    /// The old registration is released before the new one is requested,
    /// so both are never held at once. Disabled hotkeys make no OS calls.
    /// When the release fails the hotkey drops to `EnabledUnbound` and the
    /// next enable or rebind retries it.
    pub async fn rebind(
        &mut self,
        binder: &dyn LiveBinder,
        accelerator: &str,
    ) -> Result<(), BindError> {
        match self.state {
            BindingState::Disabled => Ok(()),
            BindingState::EnabledUnbound => self.bind(binder, accelerator).await,
            BindingState::EnabledBound => {
                let released = self.release(binder).await;
                self.transition_to(BindingState::EnabledUnbound);
                if let Err(e) = released {
                    // Binding now would hold two accelerators at once
                    warn!(id = %self.id, %e, "unbind before rebind failed");
                    self.stale = true;
                    return Err(e);
                }
                self.bind(binder, accelerator).await
            }
        }
    }

    async fn bind(&mut self, binder: &dyn LiveBinder, accelerator: &str) -> Result<(), BindError> {
        if !accelerator::validate(accelerator) {
            self.transition_to(BindingState::EnabledUnbound);
            return Err(BindError::Rejected(format!(
                "invalid accelerator {:?}",
                accelerator
            )));
        }

        if self.stale {
            if let Err(e) = self.release(binder).await {
                warn!(id = %self.id, %e, "stale registration still held");
                self.transition_to(BindingState::EnabledUnbound);
                return Err(e);
            }
        }

        let result = binder.bind(self.id, accelerator, self.id.scope()).await;
        self.record_bind(&result);
        result
    }

    /// Drop whatever the binder holds for this id
    async fn release(&mut self, binder: &dyn LiveBinder) -> Result<(), BindError> {
        match binder.unbind(self.id).await {
            Ok(()) | Err(BindError::NotRegistered(_)) => {
                if self.stale {
                    debug!(id = %self.id, "stale registration released");
                }
                self.stale = false;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn transition_to(&mut self, next: BindingState) {
        if next == self.state {
            return;
        }
        info!(id = %self.id, from = %self.state, to = %next, "binding transition");
        self.state = next;
        debug!(id = %self.id, state = %self.state, "binding state updated");
    }
}
