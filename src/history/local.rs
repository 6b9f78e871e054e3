//! Directory-backed key-value store: one JSON document per key.
//!
//! Each operation reads or replaces a whole document.  Two processes
//! updating the same key concurrently can lose one of the updates.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Value under `key`, or `None` when it was never written.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the value under `key`.
    ///
    /// Written to a sibling temp file and renamed, so readers never see a
    /// partial document.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path(key)?;
        let json = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_then_get() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.set("autoTranslate", &true).unwrap();
        assert_eq!(store.get::<bool>("autoTranslate").unwrap(), Some(true));
    }

    #[test]
    fn missing_key_is_none() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.get::<bool>("userLoggedIn").unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        for key in ["../x", "a/b", ""] {
            assert!(matches!(store.set(key, &1), Err(StoreError::InvalidKey(_))));
        }
    }

    #[test]
    fn corrupt_document_is_a_json_error() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("translationHistory.json"), "[{").unwrap();
        assert!(matches!(
            store.get::<Vec<u8>>("translationHistory"),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn open_creates_nested_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = LocalStore::open(&nested).unwrap();
        assert!(store.dir().is_dir());
    }
}
