//! State module: the authoritative hotkey registry
//!
//! Each hotkey has an explicit binding state machine:
//! - Disabled: preference off, nothing registered
//! - EnabledUnbound: preference on, OS registration missing
//! - EnabledBound: preference on and registered

mod machine;
mod registry;

pub use machine::BindingState;
pub use registry::{HotkeyRegistry, MutationReport};
