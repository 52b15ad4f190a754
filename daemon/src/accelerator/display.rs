//! Platform-aware rendering of accelerators for humans

use serde::{Deserialize, Serialize};

/// Target platform for display strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// Platform this daemon was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Map a platform name (`darwin`, `win32`, `linux`, ...) to a platform.
    ///
    /// Unknown names render like Linux.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "mac" | "mac_os" => Self::MacOs,
            "win32" | "windows" => Self::Windows,
            _ => Self::Linux,
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::MacOs => write!(f, "darwin"),
            Platform::Windows => write!(f, "win32"),
            Platform::Linux => write!(f, "linux"),
        }
    }
}

/// Render an accelerator for the given platform.
///
/// `CommandOrControl`/`CmdOrCtrl` become `Cmd` on macOS and `Ctrl` elsewhere;
/// `Meta`/`Super` become `Cmd` on macOS and `Win` elsewhere. Other tokens
/// pass through untouched.
pub fn to_display_string(accelerator: &str, platform: Platform) -> String {
    if accelerator.is_empty() {
        return String::new();
    }

    accelerator
        .split('+')
        .map(|token| display_token(token, platform))
        .collect::<Vec<_>>()
        .join("+")
}

fn display_token(token: &str, platform: Platform) -> &str {
    let mac = platform == Platform::MacOs;
    match token {
        "CommandOrControl" | "CmdOrCtrl" => {
            if mac {
                "Cmd"
            } else {
                "Ctrl"
            }
        }
        "Meta" | "Super" => {
            if mac {
                "Cmd"
            } else {
                "Win"
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_per_platform() {
        let darwin = Platform::from_name("darwin");
        let win = Platform::from_name("win32");
        assert_eq!(to_display_string("CommandOrControl+Shift+T", darwin), "Cmd+Shift+T");
        assert_eq!(to_display_string("CommandOrControl+Shift+T", win), "Ctrl+Shift+T");
        assert_eq!(to_display_string("Super+Alt+K", darwin), "Cmd+Alt+K");
        assert_eq!(to_display_string("Meta+K", Platform::Linux), "Win+K");
        assert_eq!(to_display_string("CmdOrCtrl+Space", Platform::Linux), "Ctrl+Space");
    }

    #[test]
    fn test_display_empty_and_garbage() {
        assert_eq!(to_display_string("", Platform::MacOs), "");
        assert_eq!(to_display_string("+++", Platform::Windows), "+++");
        let long = "Meta+".repeat(2_000);
        assert!(to_display_string(&long, Platform::Windows).starts_with("Win+Win+"));
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::from_name("Darwin"), Platform::MacOs);
        assert_eq!(Platform::from_name("freebsd"), Platform::Linux);
        assert_eq!(Platform::Windows.to_string(), "win32");
    }
}
