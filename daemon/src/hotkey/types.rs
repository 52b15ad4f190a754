//! Hotkey identifiers, scopes and configuration snapshots

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The fixed set of hotkeys the application exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotkeyId {
    /// Toggle the main window's always-on-top flag
    AlwaysOnTop,
    /// Hide every window at once
    BossKey,
    /// Open the quick chat prompt
    QuickChat,
    /// Print the current conversation to PDF
    PrintToPdf,
}

/// Where a hotkey fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// System-wide, even when the application is in the background
    Global,
    /// Only while an application window has focus
    Application,
}

impl HotkeyId {
    pub const ALL: [HotkeyId; 4] = [
        HotkeyId::AlwaysOnTop,
        HotkeyId::BossKey,
        HotkeyId::QuickChat,
        HotkeyId::PrintToPdf,
    ];

    /// Wire name used in requests and notifications
    pub fn as_str(self) -> &'static str {
        match self {
            HotkeyId::AlwaysOnTop => "alwaysOnTop",
            HotkeyId::BossKey => "bossKey",
            HotkeyId::QuickChat => "quickChat",
            HotkeyId::PrintToPdf => "printToPdf",
        }
    }

    /// Exact-match lookup by wire name
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == raw)
    }

    /// Position in [`HotkeyId::ALL`]
    pub fn index(self) -> usize {
        match self {
            HotkeyId::AlwaysOnTop => 0,
            HotkeyId::BossKey => 1,
            HotkeyId::QuickChat => 2,
            HotkeyId::PrintToPdf => 3,
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            HotkeyId::AlwaysOnTop | HotkeyId::BossKey | HotkeyId::QuickChat => Scope::Global,
            HotkeyId::PrintToPdf => Scope::Application,
        }
    }

    pub fn default_accelerator(self) -> &'static str {
        match self {
            HotkeyId::AlwaysOnTop => "CommandOrControl+Alt+P",
            HotkeyId::BossKey => "CommandOrControl+Alt+H",
            HotkeyId::QuickChat => "CommandOrControl+Shift+Space",
            HotkeyId::PrintToPdf => "CommandOrControl+Shift+P",
        }
    }

    pub fn default_config(self) -> HotkeyConfig {
        HotkeyConfig {
            enabled: true,
            accelerator: self.default_accelerator().to_string(),
        }
    }

    /// Store key holding the enabled flag
    pub fn enabled_key(self) -> &'static str {
        match self {
            HotkeyId::AlwaysOnTop => "hotkeyAlwaysOnTop",
            HotkeyId::BossKey => "hotkeyBossKey",
            HotkeyId::QuickChat => "hotkeyQuickChat",
            HotkeyId::PrintToPdf => "hotkeyPrintToPdf",
        }
    }

    /// Store key holding the accelerator
    pub fn accelerator_key(self) -> &'static str {
        match self {
            HotkeyId::AlwaysOnTop => "acceleratorAlwaysOnTop",
            HotkeyId::BossKey => "acceleratorBossKey",
            HotkeyId::QuickChat => "acceleratorQuickChat",
            HotkeyId::PrintToPdf => "acceleratorPrintToPdf",
        }
    }
}

impl std::fmt::Display for HotkeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preference for one hotkey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    pub enabled: bool,
    pub accelerator: String,
}

/// `{id: enabled}` slice broadcast after enable/disable
pub type EnabledMap = BTreeMap<HotkeyId, bool>;

/// `{id: accelerator}` slice broadcast after an accelerator change
pub type AcceleratorMap = BTreeMap<HotkeyId, String>;

/// Configuration of every hotkey at one instant.
///
/// One field per id, so a snapshot can never be missing an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeySettings {
    pub always_on_top: HotkeyConfig,
    pub boss_key: HotkeyConfig,
    pub quick_chat: HotkeyConfig,
    pub print_to_pdf: HotkeyConfig,
}

impl HotkeySettings {
    pub fn get(&self, id: HotkeyId) -> &HotkeyConfig {
        match id {
            HotkeyId::AlwaysOnTop => &self.always_on_top,
            HotkeyId::BossKey => &self.boss_key,
            HotkeyId::QuickChat => &self.quick_chat,
            HotkeyId::PrintToPdf => &self.print_to_pdf,
        }
    }

    pub fn get_mut(&mut self, id: HotkeyId) -> &mut HotkeyConfig {
        match id {
            HotkeyId::AlwaysOnTop => &mut self.always_on_top,
            HotkeyId::BossKey => &mut self.boss_key,
            HotkeyId::QuickChat => &mut self.quick_chat,
            HotkeyId::PrintToPdf => &mut self.print_to_pdf,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (HotkeyId, &HotkeyConfig)> + '_ {
        HotkeyId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn enabled_map(&self) -> EnabledMap {
        self.iter().map(|(id, config)| (id, config.enabled)).collect()
    }

    pub fn accelerator_map(&self) -> AcceleratorMap {
        self.iter()
            .map(|(id, config)| (id, config.accelerator.clone()))
            .collect()
    }
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            always_on_top: HotkeyId::AlwaysOnTop.default_config(),
            boss_key: HotkeyId::BossKey.default_config(),
            quick_chat: HotkeyId::QuickChat.default_config(),
            print_to_pdf: HotkeyId::PrintToPdf.default_config(),
        }
    }
}
