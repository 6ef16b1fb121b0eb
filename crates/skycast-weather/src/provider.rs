//! Forecast fetching from the OpenWeatherMap 5 day / 3 hour endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use skycast_core::{Units, WeatherConfig};
use tracing::instrument;

use crate::error::WeatherError;
use crate::types::api::ForecastResponse;
use crate::types::{ForecastReading, ForecastSeries};

const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ForecastProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    units: Units,
    lang: String,
}

impl ForecastProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        units: Units,
        lang: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
            api_key,
            units,
            lang: lang.to_string(),
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let timeout = (config.request_timeout_secs > 0)
            .then(|| Duration::from_secs(config.request_timeout_secs));
        Self::new(
            &config.forecast_url,
            config.effective_api_key(),
            config.units,
            &config.lang,
            timeout,
        )
    }

    /// Fetch the full forecast series for `city`.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, city: &str) -> Result<ForecastSeries, WeatherError> {
        let mut url = format!(
            "{}?q={}&units={}&lang={}",
            self.base_url,
            urlencoding::encode(city),
            self.units.as_str(),
            urlencoding::encode(&self.lang),
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&appid={}", urlencoding::encode(key)));
        }

        let response = self.client.get(&url).send().await?;
        let body: ForecastResponse = handle_response(response, city).await?;

        let series = body
            .list
            .into_iter()
            .map(ForecastReading::try_from)
            .collect::<Result<ForecastSeries, _>>()?;

        tracing::info!("Fetched {} forecast readings for {}", series.len(), city);
        Ok(series)
    }
}

pub(crate) fn build_client(timeout: Option<Duration>) -> Result<Client, WeatherError> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Map status codes to errors and decode successful bodies.
///
/// `subject` names what was asked for (city or query) and ends up in
/// not-found errors.
pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    subject: &str,
) -> Result<T, WeatherError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))
    } else if status == StatusCode::UNAUTHORIZED {
        Err(WeatherError::InvalidApiKey)
    } else if status == StatusCode::NOT_FOUND {
        Err(WeatherError::CityNotFound(subject.to_string()))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(WeatherError::Http {
            status: status.as_u16(),
            message: text,
        })
    }
}
