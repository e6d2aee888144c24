use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    Config, Forecast, LocationQuery, WeatherSnapshot,
    provider::openweather::OpenWeatherProvider,
};

pub mod openweather;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {provider} failed")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("location '{0}' not found")]
    NotFound(String),

    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse {provider} response")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} forecast response contained no data")]
    EmptyForecast { provider: &'static str },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, ProviderError>;

    async fn forecast(&self, query: &LocationQuery) -> Result<Forecast, ProviderError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.resolved_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: run `weatherlog configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    let settings = config.openweather.clone().unwrap_or_default();
    let timeout = Duration::from_secs(settings.timeout_secs());

    let mut provider = OpenWeatherProvider::with_timeout(api_key, timeout)?;
    if let Some(base_url) = settings.base_url {
        provider = provider.with_base_url(base_url);
    }

    Ok(Box::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        if std::env::var(crate::config::API_KEY_ENV).is_ok() {
            return;
        }

        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No OpenWeather API key configured"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        assert!(provider_from_config(&cfg).is_ok());
    }
}
