//! Core library for the `weatherlog` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers (OpenWeather)
//! - Key-value persistence and the bounded lookup history built on it
//! - Saved locations, weather advice and threshold alerts
//!
//! It is used by `weatherlog-cli`, but can also be reused by other binaries or services.

pub mod advice;
pub mod alerts;
pub mod config;
pub mod history;
pub mod locations;
pub mod model;
pub mod provider;
pub mod storage;

pub use alerts::{Alert, AlertKind, AlertThresholds, Notifier, TracingNotifier};
pub use config::{Config, HistoryConfig, ProviderConfig};
pub use history::{HistoryError, HistoryLog};
pub use locations::{LocationsError, SavedLocations};
pub use model::{
    Condition, Forecast, ForecastEntry, LocationQuery, MainReadings, WeatherLogEntry,
    WeatherSnapshot, Wind,
};
pub use provider::{ProviderError, WeatherProvider};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
