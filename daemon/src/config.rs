//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::accelerator::Platform;

/// Overrides the data directory
const DATA_DIR_ENV: &str = "HOTKEY_SYNC_DATA_DIR";
/// Overrides the socket path
const SOCKET_ENV: &str = "HOTKEY_SYNC_SOCKET";
/// Overrides the platform used for display strings
const PLATFORM_ENV: &str = "HOTKEY_SYNC_PLATFORM";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// JSON file holding persisted hotkey preferences
    pub settings_path: PathBuf,

    /// Platform used when rendering accelerators for display
    pub platform: Platform,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(&home)
                    .join(".local")
                    .join("share")
                    .join("hotkey-sync")
            }
        };

        let socket_path = std::env::var_os(SOCKET_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let platform = std::env::var(PLATFORM_ENV)
            .map(|name| Platform::from_name(&name))
            .unwrap_or_else(|_| Platform::current());

        Ok(Self {
            socket_path,
            settings_path: data_dir.join("hotkeys.json"),
            data_dir,
            platform,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.settings_path.starts_with(&config.data_dir));
        assert!(config.settings_path.ends_with("hotkeys.json"));
    }
}
