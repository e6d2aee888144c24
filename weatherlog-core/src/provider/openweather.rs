use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::model::{
    Condition, Forecast, ForecastEntry, LocationQuery, MainReadings, WeatherSnapshot, Wind,
};

use super::{ProviderError, WeatherProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const PROVIDER: &str = "openweather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_timeout(api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, ..Self::new(api_key) })
    }

    /// Point the provider at another host, e.g. a mock server in tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &LocationQuery,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut params: Vec<(&str, String)> = match query {
            LocationQuery::City(name) => vec![("q", name.clone())],
            LocationQuery::Coords { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));

        debug!(endpoint, %query, "requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Request { provider: PROVIDER, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Request { provider: PROVIDER, source })?;

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(query.to_string()));
        }

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ProviderError::Decode { provider: PROVIDER, source })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: Option<f64>,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

impl From<OwMain> for MainReadings {
    fn from(m: OwMain) -> Self {
        Self { temp: m.temp, humidity: m.humidity, feels_like: m.feels_like }
    }
}

impl From<OwWeather> for Condition {
    fn from(w: OwWeather) -> Self {
        Self { main: w.main, description: w.description }
    }
}

impl From<OwWind> for Wind {
    fn from(w: OwWind) -> Self {
        Self { speed: w.speed }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, ProviderError> {
        let parsed: OwCurrentResponse = self.get_json("weather", query).await?;

        // Coordinate lookups over open water come back without a name.
        let city = if parsed.name.is_empty() { query.to_string() } else { parsed.name };

        Ok(WeatherSnapshot {
            city,
            main: parsed.main.into(),
            weather: parsed.weather.into_iter().map(Into::into).collect(),
            wind: parsed.wind.map(Into::into),
        })
    }

    async fn forecast(&self, query: &LocationQuery) -> Result<Forecast, ProviderError> {
        let parsed: OwForecastResponse = self.get_json("forecast", query).await?;

        if parsed.list.is_empty() {
            return Err(ProviderError::EmptyForecast { provider: PROVIDER });
        }

        let entries = parsed
            .list
            .into_iter()
            .filter_map(|e| {
                Some(ForecastEntry {
                    dt: unix_to_utc(e.dt)?,
                    main: e.main.into(),
                    weather: e.weather.into_iter().map(Into::into).collect(),
                    wind: e.wind.map(Into::into),
                })
            })
            .collect();

        Ok(Forecast {
            city: parsed.city.name,
            timezone_offset_secs: parsed.city.timezone,
            entries,
        })
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
