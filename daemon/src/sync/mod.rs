//! Fan-out of hotkey notifications to open windows
//!
//! Windows subscribe to a [`SyncHub`]; each delivery is isolated so a
//! destroyed or broken window never affects the others.

mod hub;

pub use hub::{ChannelSink, DeliveryError, DeliveryReport, SyncHub, WindowId, WindowSink};
