//! JSON file backed store
//!
//! The whole store is one JSON object, rewritten atomically (temp file +
//! rename) on every write.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{SettingsStore, StoreError};

/// Settings store persisted as a flat JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store. A corrupt file is logged and
    /// treated as empty; it is replaced on the next write.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let values = match fs::read_to_string(path) {
            Ok(content) => match Self::decode(&content) {
                Ok(values) => values,
                Err(e) => {
                    warn!(?path, %e, "ignoring unreadable settings file");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(?path, keys = values.len(), "settings store opened");

        Ok(Self {
            path: path.to_owned(),
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(content: &str) -> Result<Map<String, Value>, StoreError> {
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(content)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }

    fn write_file(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        next.insert(key.to_string(), value);
        self.write_file(&next)?;
        *values = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("hotkeys.json")).unwrap();
        assert_eq!(store.get("acceleratorBossKey").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hotkeys.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("acceleratorBossKey", json!("Alt+Shift+B")).unwrap();
        store.set("hotkeyQuickChat", json!(false)).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("acceleratorBossKey").unwrap(), Some(json!("Alt+Shift+B")));
        assert_eq!(reopened.get("hotkeyQuickChat").unwrap(), Some(json!(false)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hotkeys.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("hotkeyBossKey").unwrap(), None);

        store.set("hotkeyBossKey", json!(true)).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("hotkeyBossKey"));
    }

    #[test]
    fn test_failed_write_keeps_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("hotkeys.json");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let store = JsonFileStore {
            path: path.clone(),
            values: Mutex::new(Map::new()),
        };
        assert!(store.set("hotkeyBossKey", json!(false)).is_err());
        assert_eq!(store.get("hotkeyBossKey").unwrap(), None);
    }
}
