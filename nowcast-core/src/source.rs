use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::FetchError,
    location::Coordinate,
    model::{Units, WeatherSnapshot},
    source::openweather::OpenWeatherClient,
};

pub mod openweather;

/// Anything that can produce a snapshot for a coordinate.
///
/// Implementations own their retry behaviour; callers only ever see the
/// final outcome.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch(&self, coordinate: Coordinate, units: Units) -> Result<WeatherSnapshot, FetchError>;
}

/// Construct the OpenWeather client from config.
pub fn source_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherSource>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
                 Hint: run `nowcast configure` or set NOWCAST_API_KEY."
        )
    })?;

    let client = OpenWeatherClient::builder(api_key)
        .endpoint(config.endpoint())
        .retry(config.retry_policy())
        .timeout(config.timeout())
        .build()?;

    Ok(Box::new(client))
}
