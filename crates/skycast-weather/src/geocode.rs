//! City autocomplete: turns a partial search string into municipality names.
//! Uses the French national address API (api-adresse.data.gouv.fr), no key required.

use std::time::Duration;

use reqwest::Client;
use skycast_core::{WeatherConfig, MIN_QUERY_LEN};
use tracing::instrument;

use crate::error::WeatherError;
use crate::provider::{build_client, handle_response};
use crate::types::api::GeocodeResponse;

/// Feature type kept in suggestions
pub const MUNICIPALITY: &str = "municipality";

#[derive(Debug, Clone)]
pub struct CityResolver {
    client: Client,
    base_url: String,
    min_query_len: usize,
}

impl CityResolver {
    pub fn new(base_url: &str, min_query_len: usize, timeout: Option<Duration>) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
            min_query_len,
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let timeout = (config.request_timeout_secs > 0)
            .then(|| Duration::from_secs(config.request_timeout_secs));
        Self::new(&config.geocoding_url, config.min_query_len, timeout)
    }

    /// True when `query` is long enough to be worth a lookup.
    pub fn needs_lookup(&self, query: &str) -> bool {
        query_needs_lookup(query, self.min_query_len)
    }

    /// Municipality names matching `query`, in provider order.
    ///
    /// Short queries resolve to an empty list without touching the network.
    #[instrument(skip(self), level = "debug")]
    pub async fn suggest(&self, query: &str) -> Result<Vec<String>, WeatherError> {
        if !self.needs_lookup(query) {
            return Ok(Vec::new());
        }

        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));
        let response = self.client.get(&url).send().await?;
        let body: GeocodeResponse = handle_response(response, query).await?;

        let names = municipality_names(body);
        tracing::debug!("{} municipalities for {:?}", names.len(), query);
        Ok(names)
    }
}

/// Lookup threshold shared by the resolver and the view controller.
///
/// `min_query_len` below [`MIN_QUERY_LEN`] is raised to it.
pub fn query_needs_lookup(query: &str, min_query_len: usize) -> bool {
    query.chars().count() >= min_query_len.max(MIN_QUERY_LEN)
}

/// Keep municipality features, preserving order.
pub fn municipality_names(response: GeocodeResponse) -> Vec<String> {
    response
        .features
        .into_iter()
        .filter(|f| f.properties.kind == MUNICIPALITY)
        .map(|f| f.properties.name)
        .collect()
}
