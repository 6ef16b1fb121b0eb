//! Weather dashboard core for SkyCast
//!
//! City autocomplete against the French address API, 5 day / 3 hour
//! forecasts from OpenWeatherMap, and the view state that turns them into
//! day cards and an hourly chart.

pub mod controller;
pub mod error;
pub mod geocode;
pub mod projection;
pub mod provider;
pub mod service;
pub mod store;
pub mod types;

pub use controller::{ForecastRequest, Phase, SuggestRequest, ViewController};
pub use error::WeatherError;
pub use geocode::CityResolver;
pub use provider::ForecastProvider;
pub use service::{Dashboard, DashboardMessage};
pub use store::{CityStore, FileCityStore, MemoryCityStore};
pub use types::*;
