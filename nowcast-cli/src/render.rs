use nowcast_core::{LoadState, Units, WeatherSnapshot};

pub fn state(state: &LoadState, units: Units) -> String {
    match state {
        LoadState::Idle => "Idle.".to_string(),
        LoadState::Loading => "Loading...".to_string(),
        LoadState::Success(snapshot) => snapshot_text(snapshot, units),
        LoadState::Failure(failure) => {
            format!("Error ({}): {}\nPress Enter to retry.", failure.kind, failure.reason)
        }
    }
}

fn hh_mm(time: Option<chrono::NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string()).unwrap_or_else(|| "--:--".to_string())
}

pub fn snapshot_text(w: &WeatherSnapshot, units: Units) -> String {
    let temp = units.temperature_suffix();
    let speed = units.speed_suffix();

    let place = match &w.country {
        Some(country) => format!("{}, {}", w.location_name, country),
        None => w.location_name.clone(),
    };
    let (label, description) = w
        .primary_condition()
        .map(|c| (c.label.as_str(), c.description.as_str()))
        .unwrap_or(("Unknown", ""));

    let mut lines = vec![
        place,
        format!("{:.0}{temp}  {label} ({description})", w.temperature),
        format!("Feels like  {:.0}{temp}", w.feels_like),
        format!("Min / Max   {:.0}{temp} / {:.0}{temp}", w.temp_min, w.temp_max),
        format!("Humidity    {}%", w.humidity),
        format!("Pressure    {} hPa", w.pressure),
        format!("Wind        {} {speed}, {}", w.wind_speed, w.wind_compass()),
    ];
    if let Some(gust) = w.wind_gust {
        lines.push(format!("Gusts       {gust} {speed}"));
    }
    lines.extend([
        format!("Visibility  {} km", w.visibility_km()),
        format!("Cloud cover {}%", w.clouds_pct),
        format!("Sunrise     {}", hh_mm(w.sunrise_local())),
        format!("Sunset      {}", hh_mm(w.sunset_local())),
    ]);

    lines.join("\n")
}
