use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Where to look up weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    City(String),
    Coords { lat: f64, lon: f64 },
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::City(name) => f.write_str(name),
            LocationQuery::Coords { lat, lon } => write!(f, "{lat:.4},{lon:.4}"),
        }
    }
}

/// Temperature and humidity block, as reported under `main` by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    /// Degrees Celsius.
    pub temp: f64,
    /// Percent.
    pub humidity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Category such as "Rain" or "Clouds".
    pub main: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Metres per second.
    pub speed: f64,
}

/// Current conditions for one location, as returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
}

impl WeatherSnapshot {
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    /// Lowercased category of the first condition, or an empty string.
    pub fn condition_key(&self) -> String {
        self.primary_condition()
            .map(|c| c.main.to_lowercase())
            .unwrap_or_default()
    }

    pub fn wind_speed(&self) -> Option<f64> {
        self.wind.as_ref().map(|w| w.speed)
    }

    /// Name of the first reading that is NaN or infinite, if any.
    /// JSON has no encoding for those values.
    pub fn non_finite_reading(&self) -> Option<&'static str> {
        let readings = [
            ("main.temp", Some(self.main.temp)),
            ("main.feels_like", self.main.feels_like),
            ("wind.speed", self.wind_speed()),
        ];

        readings
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
            .map(|(name, _)| name)
    }
}

/// One stored record of a past lookup. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLogEntry {
    #[serde(flatten)]
    pub snapshot: WeatherSnapshot,
    /// Assigned when the entry is appended to the history, serialized as RFC 3339.
    pub timestamp: DateTime<Utc>,
}

impl WeatherLogEntry {
    pub fn stamped(snapshot: WeatherSnapshot, timestamp: DateTime<Utc>) -> Self {
        Self { snapshot, timestamp }
    }

    pub fn city(&self) -> &str {
        &self.snapshot.city
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: DateTime<Utc>,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
}

/// Three-hourly forecast for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city: String,
    /// Shift of the location's local time from UTC, in seconds.
    pub timezone_offset_secs: i32,
    pub entries: Vec<ForecastEntry>,
}

impl Forecast {
    const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 11..=13;
    const MAX_DAYS: usize = 5;

    /// One entry per day: the slots that fall around local noon, at most five.
    pub fn daily_midday(&self) -> Vec<&ForecastEntry> {
        let offset = FixedOffset::east_opt(self.timezone_offset_secs).unwrap_or(Utc.fix());

        self.entries
            .iter()
            .filter(|e| Self::MIDDAY_HOURS.contains(&e.dt.with_timezone(&offset).hour()))
            .take(Self::MAX_DAYS)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(city: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            city: city.to_string(),
            main: MainReadings { temp: 12.5, humidity: 71, feels_like: Some(11.0) },
            weather: vec![Condition {
                main: "Rain".into(),
                description: Some("light rain".into()),
            }],
            wind: Some(Wind { speed: 4.1 }),
        }
    }

    #[test]
    fn log_entry_serializes_flat_with_iso_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let entry = WeatherLogEntry::stamped(snapshot("Paris"), ts);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["city"], "Paris");
        assert_eq!(value["main"]["temp"], 12.5);
        assert_eq!(value["main"]["humidity"], 71);
        assert_eq!(value["weather"][0]["main"], "Rain");
        assert_eq!(value["timestamp"], "2024-05-01T08:30:00Z");
    }

    #[test]
    fn log_entries_survive_serialization() {
        let entries = vec![
            WeatherLogEntry::stamped(snapshot("Rome"), Utc::now()),
            WeatherLogEntry::stamped(
                WeatherSnapshot { wind: None, weather: vec![], ..snapshot("Oslo") },
                Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap(),
            ),
        ];

        let json = serde_json::to_string(&entries).unwrap();
        let back: Vec<WeatherLogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entries);
    }

    #[test]
    fn optional_fields_may_be_missing_in_stored_json() {
        let json = r#"{"city":"Lima","main":{"temp":19.0,"humidity":80},"weather":[{"main":"Clouds"}],"timestamp":"2024-01-02T03:04:05.678Z"}"#;
        let entry: WeatherLogEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.city(), "Lima");
        assert_eq!(entry.snapshot.main.feels_like, None);
        assert_eq!(entry.snapshot.weather[0].description, None);
        assert_eq!(entry.snapshot.wind, None);
    }

    #[test]
    fn condition_key_is_lowercase_or_empty() {
        assert_eq!(snapshot("X").condition_key(), "rain");

        let bare = WeatherSnapshot { weather: vec![], ..snapshot("X") };
        assert_eq!(bare.condition_key(), "");
    }

    #[test]
    fn non_finite_reading_names_the_field() {
        assert_eq!(snapshot("X").non_finite_reading(), None);

        let mut s = snapshot("X");
        s.main.temp = f64::NAN;
        assert_eq!(s.non_finite_reading(), Some("main.temp"));

        let mut s = snapshot("X");
        s.main.feels_like = Some(f64::NEG_INFINITY);
        assert_eq!(s.non_finite_reading(), Some("main.feels_like"));

        let mut s = snapshot("X");
        s.wind = Some(Wind { speed: f64::INFINITY });
        assert_eq!(s.non_finite_reading(), Some("wind.speed"));
    }

    #[test]
    fn daily_midday_uses_local_time() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let entries = (0..40)
            .map(|i| ForecastEntry {
                dt: start + chrono::Duration::hours(3 * i),
                main: MainReadings { temp: i as f64, humidity: 50, feels_like: None },
                weather: vec![],
                wind: None,
            })
            .collect();

        // UTC+2: the 09:00 and 12:00 UTC slots map to 11:00 and 14:00 local.
        let forecast = Forecast { city: "Berlin".into(), timezone_offset_secs: 7200, entries };
        let days = forecast.daily_midday();

        assert_eq!(days.len(), 5);
        for day in &days {
            assert_eq!(day.dt.hour(), 9);
        }
        assert_eq!(days[0].dt.date_naive(), start.date_naive());
    }
}
