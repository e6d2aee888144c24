use async_trait::async_trait;
use chrono::{FixedOffset, Local, Offset, Utc};
use weatherlog_core::{Alert, Forecast, Notifier, WeatherLogEntry, WeatherSnapshot};

pub fn snapshot_lines(snap: &WeatherSnapshot) -> Vec<String> {
    let mut lines = vec![format!("Weather for {}", snap.city)];

    let condition = snap
        .primary_condition()
        .map(|c| match &c.description {
            Some(desc) => format!("{} ({desc})", c.main),
            None => c.main.clone(),
        })
        .unwrap_or_else(|| "Unknown".to_string());
    lines.push(format!("  Condition:   {condition}"));

    match snap.main.feels_like {
        Some(f) => lines.push(format!("  Temperature: {:.1}°C (feels like {f:.1}°C)", snap.main.temp)),
        None => lines.push(format!("  Temperature: {:.1}°C", snap.main.temp)),
    }
    lines.push(format!("  Humidity:    {}%", snap.main.humidity));

    if let Some(speed) = snap.wind_speed() {
        lines.push(format!("  Wind:        {speed:.1} m/s"));
    }

    lines
}

pub fn history_line(index: usize, entry: &WeatherLogEntry) -> String {
    let when = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let condition = entry
        .snapshot
        .primary_condition()
        .map(|c| c.main.as_str())
        .unwrap_or("-");

    format!(
        "{index:>3}  {when}  {:<16} {:>6.1}°C  {:>3}%  {condition}",
        entry.city(),
        entry.snapshot.main.temp,
        entry.snapshot.main.humidity,
    )
}

pub fn forecast_lines(forecast: &Forecast) -> Vec<String> {
    let offset = FixedOffset::east_opt(forecast.timezone_offset_secs).unwrap_or(Utc.fix());

    let mut lines = vec![format!("5-day forecast for {}", forecast.city)];
    for entry in forecast.daily_midday() {
        let day = entry.dt.with_timezone(&offset).format("%a %d %b");
        let condition = entry
            .weather
            .first()
            .map(|c| c.description.clone().unwrap_or_else(|| c.main.clone()))
            .unwrap_or_default();
        let wind = entry
            .wind
            .as_ref()
            .map(|w| format!("{:.1} m/s", w.speed))
            .unwrap_or_else(|| "-".to_string());

        lines.push(format!(
            "  {day}  {:>5.0}°C  {:>3}%  {wind:>8}  {condition}",
            entry.main.temp, entry.main.humidity,
        ));
    }

    if lines.len() == 1 {
        lines.push("  (no midday slots in the forecast window)".to_string());
    }

    lines
}

pub fn alert_line(city: &str, alert: &Alert) -> String {
    format!("{} [{city}] {}", alert.title, alert.body)
}

/// Prints alerts to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, city: &str, alert: &Alert) -> anyhow::Result<()> {
        println!("{}", alert_line(city, alert));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use weatherlog_core::{AlertKind, Condition, ForecastEntry, MainReadings, Wind};

    fn snap() -> WeatherSnapshot {
        WeatherSnapshot {
            city: "Paris".into(),
            main: MainReadings { temp: 21.44, humidity: 60, feels_like: Some(20.96) },
            weather: vec![Condition { main: "Rain".into(), description: Some("light rain".into()) }],
            wind: Some(Wind { speed: 3.6 }),
        }
    }

    #[test]
    fn snapshot_lines_show_all_readings() {
        let lines = snapshot_lines(&snap());

        assert_eq!(lines[0], "Weather for Paris");
        assert!(lines[1].contains("Rain (light rain)"));
        assert!(lines[2].contains("21.4°C (feels like 21.0°C)"));
        assert!(lines[3].contains("60%"));
        assert!(lines[4].contains("3.6 m/s"));
    }

    #[test]
    fn snapshot_lines_skip_missing_wind() {
        let mut s = snap();
        s.wind = None;
        s.weather.clear();

        let lines = snapshot_lines(&s);
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("Unknown"));
    }

    #[test]
    fn history_line_has_index_city_and_temp() {
        let entry = WeatherLogEntry::stamped(snap(), Utc::now());
        let line = history_line(3, &entry);

        assert!(line.starts_with("  3  "));
        assert!(line.contains("Paris"));
        assert!(line.contains("21.4°C"));
        assert!(line.ends_with("Rain"));
    }

    #[test]
    fn forecast_lines_list_midday_slots() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let entries = (0..16)
            .map(|i| ForecastEntry {
                dt: start + chrono::Duration::hours(3 * i),
                main: MainReadings { temp: 15.0, humidity: 40, feels_like: None },
                weather: vec![Condition { main: "Clouds".into(), description: None }],
                wind: None,
            })
            .collect();
        let forecast = Forecast { city: "London".into(), timezone_offset_secs: 0, entries };

        let lines = forecast_lines(&forecast);
        assert_eq!(lines[0], "5-day forecast for London");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Mon 03 Jun"));
        assert!(lines[2].contains("Tue 04 Jun"));
        assert!(lines[1].ends_with("Clouds"));
    }

    #[test]
    fn alert_line_includes_city() {
        let alert = Alert {
            kind: AlertKind::Rain,
            title: "🌧️ Rain alert!".into(),
            body: "Rain expected.".into(),
        };
        assert_eq!(alert_line("Oslo", &alert), "🌧️ Rain alert! [Oslo] Rain expected.");
    }
}
