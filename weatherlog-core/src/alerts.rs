//! Threshold alerts raised after a lookup.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::WeatherSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Alert when the temperature is strictly above this (°C).
    pub hot_above_c: f64,
    /// Alert when the temperature is strictly below this (°C).
    pub cold_below_c: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self { hot_above_c: 35.0, cold_below_c: 10.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Heat,
    Cold,
    Rain,
    Clouds,
    Thunderstorm,
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
}

/// Picks at most one alert. Temperature rules win over condition rules.
pub fn evaluate(snapshot: &WeatherSnapshot, thresholds: &AlertThresholds) -> Option<Alert> {
    let temp = snapshot.main.temp;
    let condition = snapshot.condition_key();

    let (kind, title, body) = if temp > thresholds.hot_above_c {
        (
            AlertKind::Heat,
            "☀️ It's really hot!".to_string(),
            format!("Temperature is above {}°C. Stay cool and hydrated.", thresholds.hot_above_c),
        )
    } else if temp < thresholds.cold_below_c {
        (
            AlertKind::Cold,
            "❄️ It's cold out!".to_string(),
            format!("Bundle up, temperature is below {}°C.", thresholds.cold_below_c),
        )
    } else if condition.contains("rain") {
        (
            AlertKind::Rain,
            "🌧️ Rain alert!".to_string(),
            "Rain expected. Don't forget your umbrella.".to_string(),
        )
    } else if condition.contains("cloud") {
        (
            AlertKind::Clouds,
            "☁️ Cloudy skies".to_string(),
            "Might be a gloomy day, but perfect for indoor vibes.".to_string(),
        )
    } else if condition.contains("thunderstorm") {
        (
            AlertKind::Thunderstorm,
            "⛈️ Thunderstorm warning".to_string(),
            "Stay indoors, stormy conditions detected.".to_string(),
        )
    } else if condition.contains("clear") {
        (
            AlertKind::Clear,
            "🌞 Clear skies".to_string(),
            "Beautiful weather outside!".to_string(),
        )
    } else {
        return None;
    };

    Some(Alert { kind, title, body })
}

/// Where alerts go once raised.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn notify(&self, city: &str, alert: &Alert) -> anyhow::Result<()>;
}

/// Emits alerts as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, city: &str, alert: &Alert) -> anyhow::Result<()> {
        info!(city, kind = ?alert.kind, title = %alert.title, "{}", alert.body);
        Ok(())
    }
}
