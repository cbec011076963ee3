//! Persistent key-value storage for the session snapshot.
//!
//! The agent reads its snapshot once at startup and writes it back after
//! every mutation. [`FsKeyValueStore`] keeps one JSON file per key under a
//! data directory; [`MemoryKeyValueStore`] backs tests and ephemeral runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{AgentError, Result};

/// Minimal get/set storage of JSON values.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    /// Copy whatever is stored under `key` aside so a later [`set`] cannot
    /// destroy it. Used when the stored value could not be read back.
    ///
    /// [`set`]: KeyValueStore::set
    fn preserve(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Filesystem-backed store.
///
/// Values live at `{data_dir}/{key}.json`. Writes are atomic
/// (temp file -> fsync -> rename) so a crash never leaves half a snapshot.
#[derive(Debug, Clone)]
pub struct FsKeyValueStore {
    data_dir: PathBuf,
}

impl FsKeyValueStore {
    /// Create the store, creating the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Storage`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            AgentError::Storage(format!(
                "failed to create data directory {}: {e}",
                data_dir.display()
            ))
        })?;
        Ok(Self { data_dir })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Where [`KeyValueStore::preserve`] copies the file for `key`.
    pub fn preserved_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json.corrupt", sanitize_key(key)))
    }
}

// Keys become file names; anything outside a conservative set is replaced.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl KeyValueStore for FsKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.key_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AgentError::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            AgentError::Storage(format!("failed to parse {}: {e}", path.display()))
        })
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let path = self.key_path(key);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| AgentError::Storage(format!("failed to serialize {key}: {e}")))?;

        let tmp_path = self
            .data_dir
            .join(format!(".{}.tmp", sanitize_key(key)));
        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| {
            AgentError::Storage(format!(
                "failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;

        if let Ok(file) = std::fs::File::open(&tmp_path) {
            let _ = file.sync_all();
        }

        std::fs::rename(&tmp_path, &path).map_err(|e| {
            AgentError::Storage(format!(
                "failed to rename temp file to {}: {e}",
                path.display()
            ))
        })
    }

    fn preserve(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        let backup = self.preserved_path(key);
        match std::fs::copy(&path, &backup) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AgentError::Storage(format!(
                "failed to copy {} to {}: {e}",
                path.display(),
                backup.display()
            ))),
        }
    }
}

/// In-memory store.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the agent wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().map(|m| m.len()).unwrap_or_default()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let values = self
            .values
            .read()
            .map_err(|e| AgentError::Storage(format!("lock poisoned: {e}")))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| AgentError::Storage(format!("lock poisoned: {e}")))?;
        values.insert(key.to_owned(), value.clone());
        Ok(())
    }
}
