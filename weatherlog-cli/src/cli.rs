use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use tracing::{info, warn};
use weatherlog_core::{
    Config, FileStore, HistoryError, HistoryLog, KeyValueStore, LocationQuery, Notifier,
    SavedLocations, WeatherProvider, advice, alerts, provider::provider_from_config,
};

use crate::output::{self, ConsoleNotifier};

const MAX_INTERVAL_MINS: u64 = 7 * 24 * 60;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherlog", version, about = "Weather lookups with a local history")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// A city name, or a coordinate pair.
#[derive(Debug, Clone, Args)]
pub struct Place {
    /// City name; falls back to `default_city` from the config.
    pub city: Option<String>,

    /// Latitude, used together with --lon instead of a city.
    #[arg(long, requires = "lon", conflicts_with = "city", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude, used together with --lat.
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

impl Place {
    fn resolve(&self, config: &Config) -> anyhow::Result<LocationQuery> {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return Ok(LocationQuery::Coords { lat, lon });
        }

        let city = match &self.city {
            Some(city) => city.trim().to_string(),
            None => config.default_city()?.to_string(),
        };
        if city.is_empty() {
            bail!("City name must not be empty");
        }

        Ok(LocationQuery::City(city))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and a default city.
    Configure,

    /// Show current weather, advice and alerts, and record the lookup.
    Show {
        #[command(flatten)]
        place: Place,

        /// Do not record this lookup in the history.
        #[arg(long)]
        no_log: bool,
    },

    /// Show the midday forecast for the next five days.
    Forecast {
        #[command(flatten)]
        place: Place,
    },

    /// Inspect or edit the lookup history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage saved cities.
    Locations {
        #[command(subcommand)]
        action: LocationsAction,
    },

    /// Poll a location and raise alerts until interrupted.
    Watch {
        #[command(flatten)]
        place: Place,

        /// Minutes between checks (at most one week).
        #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINS))]
        interval_mins: u64,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List recorded lookups in stored order, newest first.
    ///
    /// Rows are not re-sorted by timestamp so that the printed index is the
    /// one `history remove` takes.
    List,

    /// Delete the entry at INDEX (as shown by `history list`).
    Remove { index: usize },

    /// Delete every entry.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum LocationsAction {
    /// Save a city.
    Add { city: String },

    /// List saved cities.
    List,

    /// Forget a city.
    Remove { city: String },

    /// Forget every saved city.
    Clear,

    /// Show current weather for every saved city.
    Check,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Show { place, no_log } => {
                let app = App::new(config)?;
                let query = place.resolve(&app.config)?;
                app.show(&query, !no_log).await
            }
            Command::Forecast { place } => {
                let app = App::new(config)?;
                let query = place.resolve(&app.config)?;
                app.forecast(&query).await
            }
            Command::History { action } => App::new(config)?.history(action).await,
            Command::Locations { action } => App::new(config)?.locations(action).await,
            Command::Watch { place, interval_mins } => {
                let app = App::new(config)?;
                let query = place.resolve(&app.config)?;
                app.watch(&query, Duration::from_secs(interval_mins.saturating_mul(60))).await
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let current = config.default_city.clone().unwrap_or_default();
    let city = Text::new("Default city (optional):")
        .with_default(&current)
        .prompt()
        .context("Failed to read default city")?;
    config.default_city = Some(city.trim().to_string()).filter(|c| !c.is_empty());

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Services shared by the commands, built once per invocation.
struct App {
    config: Config,
    history: HistoryLog,
    locations: SavedLocations,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir));

        Ok(Self {
            history: HistoryLog::with_capacity(store.clone(), config.history.capacity),
            locations: SavedLocations::new(store),
            config,
        })
    }

    fn provider(&self) -> anyhow::Result<Box<dyn WeatherProvider>> {
        provider_from_config(&self.config)
    }

    async fn show(&self, query: &LocationQuery, record: bool) -> anyhow::Result<()> {
        let provider = self.provider()?;
        let snapshot = provider
            .current(query)
            .await
            .with_context(|| format!("Could not fetch weather for {query}"))?;

        for line in output::snapshot_lines(&snapshot) {
            println!("{line}");
        }

        println!();
        println!("Suggestions:");
        for tip in advice::suggestions(&snapshot) {
            println!("  {tip}");
        }

        if let Some(alert) = alerts::evaluate(&snapshot, &self.config.alerts) {
            println!();
            ConsoleNotifier.notify(&snapshot.city, &alert).await?;
        }

        if record {
            if let Err(err) = self.history.append(snapshot).await {
                eprintln!("warning: lookup not saved to history: {:#}", anyhow::Error::from(err));
            }
        }

        Ok(())
    }

    async fn forecast(&self, query: &LocationQuery) -> anyhow::Result<()> {
        let provider = self.provider()?;
        let forecast = provider
            .forecast(query)
            .await
            .with_context(|| format!("Could not fetch forecast for {query}"))?;

        for line in output::forecast_lines(&forecast) {
            println!("{line}");
        }

        Ok(())
    }

    async fn history(&self, action: HistoryAction) -> anyhow::Result<()> {
        match action {
            HistoryAction::List => {
                let entries = match self.history.list().await {
                    Ok(entries) => entries,
                    Err(err @ HistoryError::Corrupt(_)) => {
                        eprintln!("warning: {err}; run `weatherlog history clear --yes` to reset it");
                        Vec::new()
                    }
                    Err(err) => {
                        eprintln!("warning: {:#}", anyhow::Error::from(err));
                        Vec::new()
                    }
                };

                if entries.is_empty() {
                    println!("No weather history yet.");
                    return Ok(());
                }

                for (index, entry) in entries.iter().enumerate() {
                    println!("{}", output::history_line(index, entry));
                }
            }
            HistoryAction::Remove { index } => match self.history.remove_at(index).await? {
                Some(entry) => println!("Removed {} ({})", entry.city(), entry.timestamp.to_rfc3339()),
                None => println!("No history entry at index {index}"),
            },
            HistoryAction::Clear { yes } => {
                let confirmed = yes
                    || Confirm::new("Clear all weather history?")
                        .with_default(false)
                        .prompt()
                        .context("Failed to read confirmation")?;

                if confirmed {
                    self.history.clear().await?;
                    println!("History cleared.");
                }
            }
        }

        Ok(())
    }

    async fn locations(&self, action: LocationsAction) -> anyhow::Result<()> {
        match action {
            LocationsAction::Add { city } => {
                if self.locations.add(&city).await? {
                    println!("Saved {}", city.trim());
                } else {
                    println!("{} is already saved", city.trim());
                }
            }
            LocationsAction::List => {
                let cities = self.locations.list().await?;
                if cities.is_empty() {
                    println!("No saved locations.");
                }
                for city in cities {
                    println!("{city}");
                }
            }
            LocationsAction::Remove { city } => {
                if self.locations.remove(&city).await? {
                    println!("Removed {}", city.trim());
                } else {
                    println!("{} was not saved", city.trim());
                }
            }
            LocationsAction::Clear => {
                self.locations.clear().await?;
                println!("Saved locations cleared.");
            }
            LocationsAction::Check => {
                let cities = self.locations.list().await?;
                if cities.is_empty() {
                    println!("No saved locations.");
                    return Ok(());
                }

                let provider = self.provider()?;
                for city in cities {
                    match provider.current(&LocationQuery::City(city.clone())).await {
                        Ok(snap) => println!(
                            "{:<16} {:>6.1}°C  {}",
                            snap.city,
                            snap.main.temp,
                            snap.primary_condition().map(|c| c.main.as_str()).unwrap_or("-"),
                        ),
                        Err(err) => println!("{city:<16} unavailable: {err}"),
                    }
                }
            }
        }

        Ok(())
    }

    async fn watch(&self, query: &LocationQuery, every: Duration) -> anyhow::Result<()> {
        let provider = self.provider()?;
        let notifier = ConsoleNotifier;
        let mut ticker = tokio::time::interval(every);

        info!(%query, every_secs = every.as_secs(), "watching for weather alerts");
        println!("Watching {query} every {} min. Press Ctrl-C to stop.", every.as_secs() / 60);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = check_once(provider.as_ref(), &notifier, query, &self.config).await {
                        warn!(%query, error = %format!("{err:#}"), "weather check failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("watch stopped");
                    return Ok(());
                }
            }
        }
    }
}

async fn check_once(
    provider: &dyn WeatherProvider,
    notifier: &dyn Notifier,
    query: &LocationQuery,
    config: &Config,
) -> anyhow::Result<()> {
    let snapshot = provider.current(query).await?;

    match alerts::evaluate(&snapshot, &config.alerts) {
        Some(alert) => notifier.notify(&snapshot.city, &alert).await,
        None => {
            info!(city = %snapshot.city, temp = snapshot.main.temp, "no alert");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use weatherlog_core::{
        Alert, AlertKind, Condition, Forecast, MainReadings, ProviderError, WeatherSnapshot,
    };

    #[test]
    fn cli_parses_show_with_city() {
        let cli = Cli::try_parse_from(["weatherlog", "show", "Paris", "--no-log"]).unwrap();
        match cli.command {
            Command::Show { place, no_log } => {
                assert_eq!(place.city.as_deref(), Some("Paris"));
                assert!(no_log);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_coordinates() {
        let cli =
            Cli::try_parse_from(["weatherlog", "show", "--lat", "-33.9", "--lon", "18.4"]).unwrap();
        let Command::Show { place, .. } = cli.command else {
            panic!("expected show");
        };

        let query = place.resolve(&Config::default()).unwrap();
        assert_eq!(query, LocationQuery::Coords { lat: -33.9, lon: 18.4 });
    }

    #[test]
    fn lat_requires_lon() {
        assert!(Cli::try_parse_from(["weatherlog", "show", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn cli_parses_history_remove() {
        let cli = Cli::try_parse_from(["weatherlog", "history", "remove", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History { action: HistoryAction::Remove { index: 3 } }
        ));
    }

    #[test]
    fn watch_interval_must_be_positive() {
        assert!(Cli::try_parse_from(["weatherlog", "watch", "Oslo", "--interval-mins", "0"]).is_err());

        let cli = Cli::try_parse_from(["weatherlog", "watch", "Oslo"]).unwrap();
        assert!(matches!(cli.command, Command::Watch { interval_mins: 15, .. }));
    }

    #[test]
    fn history_list_help_ties_rows_to_remove_index() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let list = cli
            .find_subcommand("history")
            .and_then(|h| h.find_subcommand("list"))
            .unwrap();

        let help = list.get_long_about().unwrap().to_string();
        assert!(help.contains("history remove"));
    }

    #[test]
    fn watch_interval_is_capped_at_a_week() {
        let cli = Cli::try_parse_from(["weatherlog", "watch", "Oslo", "--interval-mins", "10080"]).unwrap();
        assert!(matches!(cli.command, Command::Watch { interval_mins: 10_080, .. }));

        for too_big in ["10081", "4611686018427387904"] {
            assert!(
                Cli::try_parse_from(["weatherlog", "watch", "Oslo", "--interval-mins", too_big]).is_err(),
                "{too_big} should be rejected"
            );
        }
    }

    #[test]
    fn place_falls_back_to_default_city() {
        let place = Place { city: None, lat: None, lon: None };

        assert!(place.resolve(&Config::default()).is_err());

        let cfg = Config { default_city: Some("Rome".into()), ..Config::default() };
        assert_eq!(place.resolve(&cfg).unwrap(), LocationQuery::City("Rome".into()));
    }

    #[derive(Debug)]
    struct FixedProvider(f64);

    #[async_trait]
    impl WeatherProvider for FixedProvider {
        async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, ProviderError> {
            Ok(WeatherSnapshot {
                city: query.to_string(),
                main: MainReadings { temp: self.0, humidity: 50, feels_like: None },
                weather: vec![Condition { main: "Haze".into(), description: None }],
                wind: None,
            })
        }

        async fn forecast(&self, query: &LocationQuery) -> Result<Forecast, ProviderError> {
            Err(ProviderError::NotFound(query.to_string()))
        }
    }

    #[derive(Debug, Default)]
    struct RecordingNotifier(Mutex<Vec<(String, AlertKind)>>);

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, city: &str, alert: &Alert) -> anyhow::Result<()> {
            self.0.lock().unwrap().push((city.to_string(), alert.kind));
            Ok(())
        }
    }

    #[tokio::test]
    async fn check_once_notifies_on_threshold() {
        let notifier = RecordingNotifier::default();
        let query = LocationQuery::City("Cairo".into());

        check_once(&FixedProvider(40.0), &notifier, &query, &Config::default()).await.unwrap();
        check_once(&FixedProvider(20.0), &notifier, &query, &Config::default()).await.unwrap();

        let seen = notifier.0.lock().unwrap();
        assert_eq!(*seen, vec![("Cairo".to_string(), AlertKind::Heat)]);
    }
}
