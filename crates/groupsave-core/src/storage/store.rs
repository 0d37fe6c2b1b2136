use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{FileBackend, MemoryBackend, StorageBackend, StoredEntry};

/// Expiry-aware key-value adapter over a `StorageBackend`.
///
/// Clone is cheap and clones share the same backend. There is no in-memory
/// cache: every read goes to the backend.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by `<dir>/<key>.json` files.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(dir)))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Persist `value` under `key`, expiring after `ttl` when given.
    ///
    /// Values that serialize to `null` or cannot be serialized are rejected
    /// with a warning and the key is removed. Backend failures are logged.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let value = match serde_json::to_value(value) {
            Ok(Value::Null) => {
                warn!(key, "Refusing to store null value, removing entry");
                self.remove(key);
                return;
            }
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Refusing to store non-serializable value, removing entry");
                self.remove(key);
                return;
            }
        };

        let entry = StoredEntry::new(value, ttl);
        let contents = match serde_json::to_string(&entry) {
            Ok(contents) => contents,
            Err(e) => {
                error!(key, error = %e, "Failed to encode stored entry");
                return;
            }
        };

        debug!(key, expires_at = ?entry.expires_at, "Saving entry");
        if let Err(e) = self.backend.set(key, &contents) {
            error!(key, error = %e, "Failed to save entry");
        }
    }

    /// Read the value under `key`.
    ///
    /// Missing, unreadable, malformed, mistyped and expired entries all read
    /// as `None`. Expired entries are removed as a side effect.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let contents = match self.backend.get(key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                error!(key, error = %e, "Failed to read entry");
                return None;
            }
        };

        let entry: StoredEntry<Value> = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Ignoring malformed entry");
                return None;
            }
        };

        if entry.is_expired() {
            debug!(key, "Entry expired, removing");
            self.remove(key);
            return None;
        }

        if entry.value.is_null() {
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored value has unexpected shape");
                None
            }
        }
    }

    /// Remove `key`. Failures are logged.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            error!(key, error = %e, "Failed to remove entry");
        }
    }

    /// Remove every entry. Failures are logged.
    pub fn clear(&self) {
        if let Err(e) = self.backend.clear() {
            error!(error = %e, "Failed to clear storage");
        }
    }
}
