//! Bookmarked cities.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

pub const LOCATIONS_KEY: &str = "locations";

#[derive(Debug, Error)]
pub enum LocationsError {
    #[error("location name must not be empty")]
    EmptyName,

    #[error("failed to read saved locations")]
    StorageRead(#[source] StorageError),

    #[error("failed to write saved locations")]
    StorageWrite(#[source] StorageError),

    #[error("stored locations are not valid JSON")]
    Corrupt(#[source] serde_json::Error),

    #[error("failed to encode saved locations")]
    Encode(#[source] serde_json::Error),
}

/// Saved city names, kept in the order they were added.
#[derive(Debug, Clone)]
pub struct SavedLocations {
    store: Arc<dyn KeyValueStore>,
    writer: Arc<Mutex<()>>,
}

impl SavedLocations {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, writer: Arc::new(Mutex::new(())) }
    }

    /// Returns `false` if the city was already saved (names compare case-insensitively).
    pub async fn add(&self, city: &str) -> Result<bool, LocationsError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(LocationsError::EmptyName);
        }

        let _writer = self.writer.lock().await;
        let mut cities = self.load().await?;

        if cities.iter().any(|c| same_city(c, city)) {
            debug!(city, "location already saved");
            return Ok(false);
        }

        cities.push(city.to_string());
        self.save(&cities).await?;
        Ok(true)
    }

    pub async fn list(&self) -> Result<Vec<String>, LocationsError> {
        self.load().await
    }

    /// Returns whether anything was removed.
    pub async fn remove(&self, city: &str) -> Result<bool, LocationsError> {
        let city = city.trim();
        let _writer = self.writer.lock().await;

        let mut cities = self.load().await?;
        let before = cities.len();
        cities.retain(|c| !same_city(c, city));

        if cities.len() == before {
            return Ok(false);
        }

        self.save(&cities).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), LocationsError> {
        let _writer = self.writer.lock().await;
        self.store
            .remove(LOCATIONS_KEY)
            .await
            .map_err(LocationsError::StorageWrite)
            .inspect_err(|e| warn!(error = %e, "failed to clear saved locations"))
    }

    async fn load(&self) -> Result<Vec<String>, LocationsError> {
        let raw = self
            .store
            .get(LOCATIONS_KEY)
            .await
            .map_err(LocationsError::StorageRead)
            .inspect_err(|e| warn!(error = %e, "failed to load saved locations"))?;

        match raw {
            Some(json) => serde_json::from_str(&json).map_err(LocationsError::Corrupt),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, cities: &[String]) -> Result<(), LocationsError> {
        let json = serde_json::to_string(cities).map_err(LocationsError::Encode)?;
        self.store
            .set(LOCATIONS_KEY, &json)
            .await
            .map_err(LocationsError::StorageWrite)
            .inspect_err(|e| warn!(error = %e, "failed to save locations"))
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
