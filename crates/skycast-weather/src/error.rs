//! Weather-specific error types.

use skycast_core::{AppError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Network(err) => AppError::Network(err.into_network_error()),
            WeatherError::Http { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            WeatherError::CityNotFound(city) => {
                AppError::Weather(skycast_core::WeatherError::CityNotFound(city))
            }
            WeatherError::InvalidApiKey => {
                AppError::Weather(skycast_core::WeatherError::InvalidApiKey)
            }
            WeatherError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
        }
    }
}
