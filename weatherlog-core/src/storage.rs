//! Asynchronous key-value persistence.
//!
//! Everything the tool remembers between runs (history, saved locations) is a
//! single serialized value under a string key. [`KeyValueStore`] is the seam;
//! [`FileStore`] keeps one JSON file per key, [`MemoryStore`] keeps values in
//! process memory.

use std::{
    collections::HashMap,
    fmt::Debug,
    io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("failed to read '{key}'")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write '{key}'")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove '{key}'")]
    Remove {
        key: String,
        #[source]
        source: io::Error,
    },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns `None` when nothing has been stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the whole value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { key: key.to_string(), source }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let write_err = |source| StorageError::Write { key: key.to_string(), source };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        // Replace in one step so a crash never leaves a half-written value behind.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await.map_err(write_err)?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(err));
        }

        trace!(key, path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove { key: key.to_string(), source }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}
