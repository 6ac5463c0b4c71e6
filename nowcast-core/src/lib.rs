//! Core library for the `nowcast` weather client.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client with its retry loop and response decoding
//! - An observable store holding the current load state
//!
//! It is used by `nowcast-cli`, but any front end can subscribe to a
//! [`WeatherStore`] and render its [`LoadState`].

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod retry;
pub mod source;
pub mod store;

pub use config::Config;
pub use error::{CoordinateError, FetchError, FetchErrorKind};
pub use location::{Coordinate, PresetLocation};
pub use model::{Condition, Units, WeatherRequest, WeatherSnapshot};
pub use retry::RetryPolicy;
pub use source::{WeatherSource, openweather::OpenWeatherClient};
pub use store::{LoadFailure, LoadState, LoadTicket, StoreOptions, WeatherStore};
