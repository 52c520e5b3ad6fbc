//! Durable storage for state snapshots
//!
//! The store writes a JSON snapshot of a fixed subset of top-level branches
//! under a single storage key after every write, and reads it back on
//! startup. Backends only move strings; the store owns the snapshot format.

use crate::error::{Result, StateError};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Key-value string storage used for persisted snapshots
pub trait StateStorage {
    /// Read the value stored under `key`, `None` if nothing is stored
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `data` under `key`, replacing any previous value
    fn save(&self, key: &str, data: &str) -> Result<()>;

    /// Remove the value stored under `key`
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage, lost when dropped
#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<FxHashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, e.g. to simulate a previous session
    pub fn with_value(key: &str, data: &str) -> Self {
        let storage = Self::new();
        storage
            .values
            .borrow_mut()
            .insert(key.to_string(), data.to_string());
        storage
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, data: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid || key.starts_with('.') {
            return Err(StateError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StateStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StateError::Storage(format!("{}: {}", path.display(), err))),
        }
    }

    fn save(&self, key: &str, data: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, data)
            .map_err(|e| StateError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StateError::Storage(format!("{}: {}", path.display(), err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load("k").unwrap(), None);

        storage.save("k", "{}").unwrap();
        assert_eq!(storage.load("k").unwrap(), Some("{}".to_string()));

        storage.remove("k").unwrap();
        assert_eq!(storage.load("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));

        assert_eq!(storage.load("signpost-engine-state").unwrap(), None);
        storage.save("signpost-engine-state", r#"{"user":{}}"#).unwrap();
        assert_eq!(
            storage.load("signpost-engine-state").unwrap().as_deref(),
            Some(r#"{"user":{}}"#)
        );

        storage.remove("signpost-engine-state").unwrap();
        storage.remove("signpost-engine-state").unwrap();
        assert_eq!(storage.load("signpost-engine-state").unwrap(), None);
    }

    #[test]
    fn test_file_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.save("../escape", "x").is_err());
        assert!(storage.save("", "x").is_err());
    }
}
