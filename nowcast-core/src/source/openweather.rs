use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::FetchError,
    location::Coordinate,
    model::{Condition, Units, WeatherSnapshot},
    retry::RetryPolicy,
};

use super::WeatherSource;

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the OpenWeather current-weather endpoint.
#[derive(Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
    http: Client,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

pub struct OpenWeatherClientBuilder {
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl OpenWeatherClientBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenWeatherClient> {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(OpenWeatherClient {
            api_key: self.api_key,
            endpoint: self.endpoint,
            retry: self.retry,
            http,
        })
    }
}

impl OpenWeatherClient {
    pub fn builder(api_key: impl Into<String>) -> OpenWeatherClientBuilder {
        OpenWeatherClientBuilder {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    async fn fetch_once(&self, coordinate: Coordinate, units: Units) -> Result<WeatherSnapshot, FetchError> {
        let lat = coordinate.lat().to_string();
        let lon = coordinate.lon().to_string();

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        decode_current(&body)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self, coordinate: Coordinate, units: Units) -> Result<WeatherSnapshot, FetchError> {
        tracing::debug!(%coordinate, %units, "fetching current weather");

        self.retry
            .run(|attempt| async move {
                let outcome = self.fetch_once(coordinate, units).await;
                if let Err(err) = &outcome {
                    tracing::debug!(attempt, kind = %err.kind(), "attempt failed");
                }
                outcome
            })
            .await
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: u32,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: u16,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u32,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    coord: Option<OwCoord>,
    weather: Vec<OwWeather>,
    main: OwMain,
    visibility: u32,
    wind: OwWind,
    clouds: OwClouds,
    dt: Option<i64>,
    sys: OwSys,
    timezone: i32,
    name: String,
}

impl OwCurrentResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, FetchError> {
        if self.weather.is_empty() {
            return Err(FetchError::Decode("response contained no weather conditions".to_string()));
        }

        let conditions = self
            .weather
            .into_iter()
            .map(|w| Condition { code: w.id, label: w.main, description: w.description, icon: w.icon })
            .collect();

        Ok(WeatherSnapshot {
            location_name: self.name,
            country: self.sys.country,
            coordinate: self.coord.and_then(|c| Coordinate::new(c.lat, c.lon).ok()),
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            wind_speed: self.wind.speed,
            wind_deg: self.wind.deg % 360,
            wind_gust: self.wind.gust,
            clouds_pct: self.clouds.all,
            visibility_m: self.visibility,
            conditions,
            observed_at: self.dt,
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
            timezone_offset_secs: self.timezone,
        })
    }
}

/// Decode a current-weather body. Never yields a partial snapshot.
pub fn decode_current(body: &str) -> Result<WeatherSnapshot, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;
    parsed.into_snapshot()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
