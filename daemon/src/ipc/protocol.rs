//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.
//! Request payloads keep ids and values loosely typed so the handlers can
//! reject malformed input themselves instead of dropping the frame.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accelerator::KeyEvent;
use crate::hotkey::{AcceleratorMap, EnabledMap, HotkeyId, HotkeySettings};
use crate::state::BindingState;
use crate::sync::WindowId;

/// Largest frame accepted from a client
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from windows to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Enabled flag of every hotkey
    GetIndividualSettings,

    /// Enable or disable one hotkey
    SetIndividualSetting {
        #[serde(default)]
        id: String,
        #[serde(default)]
        enabled: Value,
    },

    /// Accelerator of every hotkey
    GetAccelerators,

    /// Change one hotkey's accelerator
    SetAccelerator {
        #[serde(default)]
        id: String,
        #[serde(default)]
        accelerator: Value,
    },

    /// Enabled flag and accelerator of every hotkey
    GetFullSettings,

    /// Restore one hotkey's default configuration
    ResetToDefaults {
        #[serde(default)]
        id: String,
    },

    /// Whether each hotkey is currently registered with the OS
    GetBindingStates,

    /// Check an accelerator without storing it
    ValidateAccelerator {
        #[serde(default)]
        accelerator: String,
    },

    /// Render an accelerator for display
    DisplayAccelerator {
        #[serde(default)]
        accelerator: String,
        /// `darwin`, `win32`, `linux`; the daemon's platform when absent
        #[serde(default)]
        platform: Option<String>,
    },

    /// Turn a captured key press into an accelerator
    AcceleratorFromKeyEvent {
        #[serde(default)]
        event: KeyEvent,
    },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to change notifications
    Subscribe {
        /// Window label for logs
        #[serde(default)]
        label: Option<String>,
    },
}

/// Responses from daemon to windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    IndividualSettings { settings: EnabledMap },

    Accelerators { accelerators: AcceleratorMap },

    FullSettings { settings: HotkeySettings },

    BindingStates { states: BTreeMap<HotkeyId, BindingState> },

    /// Mutation applied
    Accepted {
        /// The preference reached the store
        persisted: bool,
        /// Binding state after the mutation
        binding: BindingState,
        /// Windows the change was delivered to
        windows: usize,
    },

    /// Mutation dropped without side effects
    Rejected { reason: String },

    Validation {
        valid: bool,
        normalized: String,
        modifiers: Vec<String>,
        key: Option<String>,
        reason: Option<String>,
    },

    Display { text: String },

    Accelerator { accelerator: String, valid: bool },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed { window: WindowId },

    /// Malformed frame
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetAccelerator {
            id: "bossKey".to_string(),
            accelerator: Value::from("Alt+Shift+B"),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_accelerator"));
        assert!(json.contains("bossKey"));
    }

    #[test]
    fn test_loose_payloads_still_parse() {
        let req: Request =
            serde_json::from_str(r#"{"type":"set_individual_setting","id":"quickChat","enabled":"yes"}"#)
                .unwrap();
        match req {
            Request::SetIndividualSetting { id, enabled } => {
                assert_eq!(id, "quickChat");
                assert_eq!(enabled, Value::from("yes"));
            }
            other => panic!("unexpected request: {:?}", other),
        }

        let req: Request = serde_json::from_str(r#"{"type":"set_accelerator"}"#).unwrap();
        assert!(matches!(
            req,
            Request::SetAccelerator { ref id, accelerator: Value::Null } if id.is_empty()
        ));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::FullSettings {
            settings: HotkeySettings::default(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("full_settings"));
        assert!(json.contains("quickChat"));
    }
}
