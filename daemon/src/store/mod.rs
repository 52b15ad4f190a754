//! Persistent key/value store for hotkey preferences
//!
//! Values are flat JSON scalars keyed by strings such as
//! `acceleratorBossKey`. Writes are synchronous from the caller's view.

mod json_file;
#[cfg(test)]
mod memory;

pub use json_file::JsonFileStore;
#[cfg(test)]
pub(crate) use memory::MemoryStore;

use serde_json::Value;

/// Errors that can occur while reading or writing the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store file does not hold a JSON object")]
    NotAnObject,
}

/// Durable key/value persistence consumed by the registry
pub trait SettingsStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a value, durable once this returns `Ok`
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}
