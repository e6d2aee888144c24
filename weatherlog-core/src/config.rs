use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{alerts::AlertThresholds, history::DEFAULT_CAPACITY};

/// Overrides the API key stored in the config file.
pub const API_KEY_ENV: &str = "WEATHERLOG_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// OpenWeather credentials and connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,

    /// Override for the API root, e.g. a local mock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of lookups kept.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_city = "Paris"
///
/// [openweather]
/// api_key = "..."
///
/// [history]
/// capacity = 20
///
/// [alerts]
/// hot_above_c = 35.0
/// cold_below_c = 10.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub default_city: Option<String>,

    /// Where history and saved locations are kept. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,

    pub openweather: Option<ProviderConfig>,

    pub history: HistoryConfig,

    pub alerts: AlertThresholds,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weatherlog", "weatherlog")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for persisted state: `data_dir` if set, else the platform data dir.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Set or replace the OpenWeather API key, keeping other provider settings.
    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.get_or_insert_with(ProviderConfig::default).api_key = api_key;
    }

    /// API key from the environment, falling back to the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        Self::pick_api_key(std::env::var(API_KEY_ENV).ok(), self)
    }

    pub(crate) fn pick_api_key(env_value: Option<String>, config: &Config) -> Option<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                config
                    .openweather
                    .as_ref()
                    .map(|p| p.api_key.clone())
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// The city to use when a command is given none.
    pub fn default_city(&self) -> Result<&str> {
        self.default_city.as_deref().filter(|c| !c.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No city given and no default city configured.\n\
                 Hint: pass a city or run `weatherlog configure`."
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::from_toml("").unwrap();

        assert!(cfg.default_city.is_none());
        assert!(cfg.openweather.is_none());
        assert_eq!(cfg.history.capacity, 20);
        assert_eq!(cfg.alerts, AlertThresholds::default());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let cfg = Config::from_toml(
            r#"
            default_city = "Oslo"

            [openweather]
            api_key = "K"

            [alerts]
            hot_above_c = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.default_city().unwrap(), "Oslo");
        assert_eq!(cfg.openweather.as_ref().unwrap().timeout_secs(), 10);
        assert_eq!(cfg.alerts.hot_above_c, 30.0);
        assert_eq!(cfg.alerts.cold_below_c, 10.0);
        assert_eq!(cfg.history.capacity, 20);
    }

    #[test]
    fn toml_roundtrip_keeps_settings() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.default_city = Some("Rome".into());
        cfg.history.capacity = 5;

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();

        assert_eq!(back.openweather.unwrap().api_key, "KEY");
        assert_eq!(back.default_city.as_deref(), Some("Rome"));
        assert_eq!(back.history.capacity, 5);
    }

    #[test]
    fn default_city_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.default_city().unwrap_err();

        assert!(err.to_string().contains("no default city configured"));
    }

    #[test]
    fn set_api_key_keeps_base_url() {
        let mut cfg = Config::default();
        cfg.openweather = Some(ProviderConfig {
            api_key: "OLD".into(),
            base_url: Some("http://localhost:1234".into()),
            timeout_secs: None,
        });

        cfg.set_api_key("NEW".into());

        let ow = cfg.openweather.unwrap();
        assert_eq!(ow.api_key, "NEW");
        assert_eq!(ow.base_url.as_deref(), Some("http://localhost:1234"));
    }

    #[test]
    fn env_key_wins_over_file_key() {
        let mut cfg = Config::default();
        assert_eq!(Config::pick_api_key(None, &cfg), None);

        cfg.set_api_key("FILE".into());
        assert_eq!(Config::pick_api_key(None, &cfg).as_deref(), Some("FILE"));
        assert_eq!(Config::pick_api_key(Some("ENV".into()), &cfg).as_deref(), Some("ENV"));
        assert_eq!(Config::pick_api_key(Some("  ".into()), &cfg).as_deref(), Some("FILE"));
    }

    #[test]
    fn explicit_data_dir_is_used() {
        let cfg = Config { data_dir: Some(PathBuf::from("/tmp/wl")), ..Config::default() };
        assert_eq!(cfg.data_dir().unwrap(), PathBuf::from("/tmp/wl"));
    }
}
