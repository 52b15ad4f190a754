//! Hotkey module: identifiers, configuration and live bindings
//!
//! The set of hotkeys is closed; each id has a fixed scope and a
//! documented default accelerator.

mod binding;
mod types;

pub use binding::{BindError, Binding, LiveBinder, TrackingBinder};
pub use types::{AcceleratorMap, EnabledMap, HotkeyConfig, HotkeyId, HotkeySettings};

#[cfg(test)]
pub(crate) use binding::testing;
