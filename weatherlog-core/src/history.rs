//! Bounded, most-recent-first log of past weather lookups.
//!
//! The whole log lives under one storage key as a JSON array. Every mutation
//! is a read-modify-write of that single value; a [`HistoryLog`] handle (and
//! its clones) run those cycles one at a time. Separate handles over the same
//! store, or separate processes, are not coordinated and can lose updates.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    model::{WeatherLogEntry, WeatherSnapshot},
    storage::{KeyValueStore, StorageError},
};

pub const HISTORY_KEY: &str = "weather_logs";
pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read weather history")]
    StorageRead(#[source] StorageError),

    #[error("failed to write weather history")]
    StorageWrite(#[source] StorageError),

    #[error("stored weather history is not valid JSON")]
    Corrupt(#[source] serde_json::Error),

    #[error("failed to encode weather history")]
    Encode(#[source] serde_json::Error),

    #[error("reading '{field}' is not a finite number")]
    InvalidEntry { field: &'static str },
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    writer: Arc<Mutex<()>>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stamps `snapshot` with the current time and puts it at the front,
    /// dropping whatever falls past capacity. Snapshots with NaN or infinite
    /// readings are rejected without touching the store.
    pub async fn append(&self, snapshot: WeatherSnapshot) -> Result<WeatherLogEntry, HistoryError> {
        if let Some(field) = snapshot.non_finite_reading() {
            let err = HistoryError::InvalidEntry { field };
            log_failure("append", &err);
            return Err(err);
        }

        let _writer = self.writer.lock().await;

        let mut entries = self.load().await.inspect_err(|e| log_failure("append", e))?;
        let entry = WeatherLogEntry::stamped(snapshot, Utc::now());

        entries.insert(0, entry.clone());
        entries.truncate(self.capacity);

        self.save(&entries).await.inspect_err(|e| log_failure("append", e))?;

        debug!(city = entry.city(), len = entries.len(), "appended history entry");
        Ok(entry)
    }

    /// Entries in storage order (most recently appended first).
    pub async fn list(&self) -> Result<Vec<WeatherLogEntry>, HistoryError> {
        self.load().await.inspect_err(|e| log_failure("list", e))
    }

    /// Entries sorted by timestamp, newest first.
    pub async fn list_by_recency(&self) -> Result<Vec<WeatherLogEntry>, HistoryError> {
        let mut entries = self.list().await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Removes the entry at `index` in storage order. An index past the end
    /// leaves the log untouched and returns `Ok(None)`.
    pub async fn remove_at(&self, index: usize) -> Result<Option<WeatherLogEntry>, HistoryError> {
        let _writer = self.writer.lock().await;

        let mut entries = self.load().await.inspect_err(|e| log_failure("remove_at", e))?;
        if index >= entries.len() {
            debug!(index, len = entries.len(), "history index out of range");
            return Ok(None);
        }

        let removed = entries.remove(index);
        self.save(&entries).await.inspect_err(|e| log_failure("remove_at", e))?;

        debug!(index, city = removed.city(), "removed history entry");
        Ok(Some(removed))
    }

    /// Drops the stored log entirely.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        let _writer = self.writer.lock().await;

        self.store
            .remove(HISTORY_KEY)
            .await
            .map_err(HistoryError::StorageWrite)
            .inspect_err(|e| log_failure("clear", e))?;

        debug!("cleared history");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<WeatherLogEntry>, HistoryError> {
        let raw = self.store.get(HISTORY_KEY).await.map_err(HistoryError::StorageRead)?;

        match raw {
            Some(json) => serde_json::from_str(&json).map_err(HistoryError::Corrupt),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[WeatherLogEntry]) -> Result<(), HistoryError> {
        let json = serde_json::to_string(entries).map_err(HistoryError::Encode)?;
        self.store.set(HISTORY_KEY, &json).await.map_err(HistoryError::StorageWrite)
    }
}

fn log_failure(op: &str, err: &HistoryError) {
    let cause = std::error::Error::source(err)
        .map(ToString::to_string)
        .unwrap_or_default();
    warn!(op, error = %err, cause = %cause, "history operation failed");
}
