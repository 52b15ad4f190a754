//! Events module for hotkey change notifications
//!
//! Provides the notifications pushed to every open window after a
//! mutation has been persisted and re-bound.

use serde::{Deserialize, Serialize};

use crate::hotkey::{AcceleratorMap, EnabledMap};

/// Notifications fanned out to subscribed windows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// One or more hotkeys were enabled or disabled
    IndividualSettingsChanged {
        /// Enabled flag of every hotkey after the change
        settings: EnabledMap,
    },

    /// One or more accelerators changed
    AcceleratorsChanged {
        /// Accelerator of every hotkey after the change
        accelerators: AcceleratorMap,
    },
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::IndividualSettingsChanged { .. } => {
                write!(f, "INDIVIDUAL_SETTINGS_CHANGED")
            }
            Notification::AcceleratorsChanged { .. } => write!(f, "ACCELERATORS_CHANGED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{HotkeyId, HotkeySettings};

    #[test]
    fn test_notification_serialization() {
        let mut accelerators = HotkeySettings::default().accelerator_map();
        accelerators.insert(HotkeyId::BossKey, "Alt+Shift+B".to_string());
        let event = Notification::AcceleratorsChanged { accelerators };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("accelerators_changed"));
        assert!(json.contains(r#""bossKey":"Alt+Shift+B""#));
    }

    #[test]
    fn test_notification_deserialization() {
        let json = r#"{"type":"individual_settings_changed","settings":{"bossKey":false}}"#;
        let event: Notification = serde_json::from_str(json).unwrap();
        match event {
            Notification::IndividualSettingsChanged { settings } => {
                assert_eq!(settings.get(&HotkeyId::BossKey), Some(&false));
            }
            other => panic!("unexpected notification: {}", other),
        }
    }
}
