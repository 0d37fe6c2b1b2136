use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raw string key-value store behind `LocalStore`.
///
/// Implementations only move strings around; envelope handling and
/// expiry live in `LocalStore`.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Extension used for every file the backend owns.
const ENTRY_EXTENSION: &str = "json";

/// Stores each key as `<dir>/<key>.json`.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !Self::is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION)))
    }

    fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        std::fs::create_dir_all(&self.dir).map_err(Self::io_error(key))?;
        std::fs::write(&path, value).map_err(Self::io_error(key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key)(e)),
        }
    }

    /// Removes only the `.json` entries, leaving anything else in the directory alone.
    ///
    /// Every entry is attempted; the first failure is returned afterwards.
    fn clear(&self) -> Result<(), StorageError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Self::io_error("*")(e)),
        };

        let mut first_error = None;
        for entry in entries {
            let result = entry.and_then(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION) {
                    std::fs::remove_file(&path)
                } else {
                    Ok(())
                }
            });
            if let Err(e) = result {
                warn!(dir = %self.dir.display(), error = %e, "Failed to remove storage entry");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(Self::io_error("*")(e)),
            None => Ok(()),
        }
    }
}

/// In-process backend. Nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_backend_roundtrip_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path().join("store"));

        assert_eq!(backend.get("token").expect("get"), None);

        backend.set("token", r#"{"value":"abc"}"#).expect("set");
        assert_eq!(
            backend.get("token").expect("get").as_deref(),
            Some(r#"{"value":"abc"}"#)
        );
        assert!(dir.path().join("store").join("token.json").exists());

        backend.remove("token").expect("remove");
        assert_eq!(backend.get("token").expect("get"), None);

        // Removing a missing key is not an error
        backend.remove("token").expect("remove missing");
    }

    #[test]
    fn test_file_backend_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());

        assert!(matches!(
            backend.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(backend.get(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(backend.get(".."), Err(StorageError::InvalidKey(_))));
        assert!(backend.get("user.prefs-v2_1").is_ok());
    }

    #[test]
    fn test_file_backend_clear_keeps_foreign_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());

        backend.set("a", "1").expect("set a");
        backend.set("b", "2").expect("set b");
        std::fs::write(dir.path().join("notes.txt"), "keep me").expect("write foreign");

        backend.clear().expect("clear");

        assert_eq!(backend.get("a").expect("get a"), None);
        assert_eq!(backend.get("b").expect("get b"), None);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_file_backend_clear_continues_past_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());

        backend.set("a", "1").expect("set a");
        backend.set("b", "2").expect("set b");
        // A directory with the entry extension cannot be removed as a file
        std::fs::create_dir(dir.path().join("stuck.json")).expect("create dir");

        assert!(matches!(backend.clear(), Err(StorageError::Io { .. })));
        assert_eq!(backend.get("a").expect("get a"), None);
        assert_eq!(backend.get("b").expect("get b"), None);
        assert!(dir.path().join("stuck.json").is_dir());
    }

    #[test]
    fn test_file_backend_clear_missing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path().join("never-created"));
        backend.clear().expect("clear on missing dir");
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty());

        backend.set("k", "v").expect("set");
        assert!(backend.contains_key("k"));
        assert_eq!(backend.get("k").expect("get").as_deref(), Some("v"));

        backend.clear().expect("clear");
        assert_eq!(backend.len(), 0);
    }
}
