use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, Select};
use nowcast_core::{
    Config, Coordinate, LoadState, StoreOptions, Units, WeatherSource, WeatherStore,
    location::find_preset, source::source_from_config,
};
use std::{sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, Interval, interval_at};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "Current weather for a few fixed places")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct Target {
    /// Preset name, e.g. "London" or "new york".
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    location: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and defaults in the config file.
    Configure,

    /// Fetch once and print the result.
    Show {
        #[command(flatten)]
        target: Target,

        /// standard, metric or imperial.
        #[arg(long)]
        units: Option<Units>,
    },

    /// Load the default location and keep printing every state change.
    /// Press Enter to refresh.
    Watch {
        #[arg(long)]
        units: Option<Units>,

        /// Move to the next preset every SECS seconds.
        #[arg(long, value_name = "SECS")]
        cycle: Option<u64>,
    },

    /// List the preset locations.
    Locations,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Show { target, units } => show(&config, &target, units).await,
            Command::Watch { units, cycle } => watch(&config, units, cycle).await,
            Command::Locations => {
                for preset in config.presets() {
                    println!("{:<12} {}", preset.name, preset.coordinate);
                }
                Ok(())
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }
    config.set_api_key(api_key.trim().to_string());

    config.units = Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(Units::all().iter().position(|u| *u == config.units).unwrap_or(0))
        .prompt()
        .context("Failed to read units")?;

    let names: Vec<String> = config.presets().into_iter().map(|p| p.name).collect();
    let default_location = Select::new("Default location:", names)
        .prompt()
        .context("Failed to read default location")?;
    config.default_location = Some(default_location);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn resolve_target(config: &Config, target: &Target) -> anyhow::Result<Coordinate> {
    if let Some(name) = &target.location {
        let presets = config.presets();
        return find_preset(&presets, name)
            .map(|p| p.coordinate)
            .ok_or_else(|| anyhow!("Unknown location '{name}'. Run `nowcast locations` to list presets."));
    }

    match (target.lat, target.lon) {
        (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)?),
        _ => Ok(config.default_location()?.coordinate),
    }
}

fn source(config: &Config) -> anyhow::Result<Arc<dyn WeatherSource>> {
    Ok(Arc::from(source_from_config(config)?))
}

// `show` loads exactly once, so the configured default location and startup
// reload play no part.
fn show_options(coordinate: Coordinate, units: Units) -> StoreOptions {
    StoreOptions { default_location: coordinate, units, reload_after: None }
}

async fn show(config: &Config, target: &Target, units: Option<Units>) -> anyhow::Result<()> {
    let coordinate = resolve_target(config, target)?;
    let units = units.unwrap_or(config.units);

    let store = WeatherStore::new(source(config)?, &show_options(coordinate, units));
    store.load(coordinate, units).finished().await;

    let state = store.state();
    println!("{}", render::state(&state, units));

    match state.failure() {
        Some(failure) => Err(anyhow!("Fetch failed ({})", failure.kind)),
        None => Ok(()),
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn watch(config: &Config, units: Option<Units>, cycle: Option<u64>) -> anyhow::Result<()> {
    let mut options = StoreOptions::from_config(config)?;
    if let Some(units) = units {
        options.units = units;
    }

    let presets = config.presets();
    let start_index = presets
        .iter()
        .position(|p| p.coordinate == options.default_location)
        .unwrap_or(0);
    let mut rotation = presets.iter().cycle().skip(start_index + 1);

    let mut cycle = cycle.filter(|secs| *secs > 0).map(|secs| {
        let period = Duration::from_secs(secs);
        interval_at(Instant::now() + period, period)
    });

    let store = WeatherStore::start(source(config)?, &options);
    let mut rx = store.subscribe();
    println!("{}", render::state(&rx.borrow_and_update(), store.units()));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state: LoadState = rx.borrow_and_update().clone();
                println!("\n{}", render::state(&state, store.units()));
            }
            _ = next_tick(&mut cycle) => {
                if let Some(preset) = rotation.next() {
                    tracing::info!(location = %preset.name, "switching location");
                    store.select_location(preset.coordinate);
                }
            }
            line = input.next_line(), if input_open => match line {
                Ok(Some(_)) => {
                    tracing::info!("manual refresh");
                    store.refresh();
                }
                Ok(None) => input_open = false,
                Err(err) => {
                    tracing::warn!(error = %err, "stdin closed");
                    input_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowcast_core::location::{LONDON, TOKYO};

    fn target(location: Option<&str>) -> Target {
        Target { location: location.map(str::to_string), lat: None, lon: None }
    }

    fn broken_default() -> Config {
        Config { default_location: Some("Atlantis".into()), ..Config::default() }
    }

    #[test]
    fn show_with_location_ignores_unknown_default() {
        let config = broken_default();

        let coordinate = resolve_target(&config, &target(Some("tokyo"))).unwrap();
        let options = show_options(coordinate, Units::Imperial);

        assert_eq!(options.default_location, TOKYO);
        assert_eq!(options.units, Units::Imperial);
        assert_eq!(options.reload_after, None);
    }

    #[test]
    fn show_with_coordinates_ignores_unknown_default() {
        let config = broken_default();
        let target = Target { location: None, lat: Some(51.5074), lon: Some(-0.1278) };

        assert_eq!(resolve_target(&config, &target).unwrap(), LONDON);
    }

    #[test]
    fn show_without_target_reports_unknown_default() {
        let err = resolve_target(&broken_default(), &target(None)).unwrap_err();

        assert!(err.to_string().contains("Atlantis"));
    }
}
