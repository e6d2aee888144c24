use crate::model::WeatherSnapshot;

const FALLBACK: &str = "👍 Weather looks fine!";

/// Clothing and activity hints for the given conditions.
pub fn suggestions(snapshot: &WeatherSnapshot) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();

    let temp = snapshot.main.temp;
    let feels_like = snapshot.main.feels_like;
    let humidity = snapshot.main.humidity;
    let condition = snapshot.condition_key();
    let wind = snapshot.wind_speed().unwrap_or(0.0);

    if temp <= 10.0 {
        out.push("🧥 Wear a warm jacket.");
    } else if temp <= 20.0 {
        out.push("🧥 Bring a light sweater.");
    } else {
        out.push("👕 T-shirt weather!");
    }

    match feels_like {
        Some(f) if f > 25.0 => out.push("🌞 It's quite hot outside. Stay hydrated!"),
        Some(f) if f < 0.0 => out.push("🥶 It's freezing! Bundle up!"),
        _ => {}
    }

    if condition.contains("rain") {
        out.push("☔ Don't forget an umbrella.");
    }
    if condition.contains("clear") {
        out.push("😎 Sunglasses recommended.");
    }
    if condition.contains("snow") {
        out.push("🧤 Dress warmly, it's snowing.");
    }
    if condition.contains("cloud") {
        out.push("🌥 Overcast weather, perfect for a cozy day.");
    }

    if wind > 10.0 {
        out.push("💨 It's windy. Wear something secure.");
    }
    if wind > 20.0 {
        out.push("🌪 Strong winds! Be careful outside.");
    }

    // Zero humidity is what a missing reading looks like; skip it.
    if humidity > 80 {
        out.push("🌫 High humidity, consider lighter clothes.");
    } else if humidity > 0 && humidity < 30 {
        out.push("💧 Low humidity, stay hydrated!");
    }

    if temp > 30.0 {
        out.push("🥵 It's scorching hot! Stay cool and find some shade.");
    }
    if temp < 0.0 {
        out.push("❄️ Extremely cold! Take extra care when going outside.");
    }

    if out.is_empty() {
        out.push(FALLBACK);
    }

    out.into_iter().map(str::to_string).collect()
}
