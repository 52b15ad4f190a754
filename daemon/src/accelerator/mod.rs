//! Accelerator grammar: parsing, validation, normalization and display
//!
//! Pure functions with no dependencies on the rest of the daemon.

mod display;
mod grammar;
mod key_event;

pub use display::{to_display_string, Platform};
pub use grammar::{check, normalize, parse, validate, AcceleratorError};
pub use key_event::{from_key_event, KeyEvent};
