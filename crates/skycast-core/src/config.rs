use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Shortest query that may reach the geocoder. `weather.min_query_len` can
/// raise it, never lower it.
pub const MIN_QUERY_LEN: usize = 3;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (also holds the last-city file)
    pub config_dir: PathBuf,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Measurement system requested from the forecast provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key; `OPENWEATHER_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    /// 5 day / 3 hour forecast endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Address search endpoint used for city autocomplete
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Icon URL template, `{icon}` is replaced by the icon identifier
    #[serde(default = "default_icon_url_template")]
    pub icon_url_template: String,

    #[serde(default)]
    pub units: Units,

    /// Language of provider descriptions
    #[serde(default = "default_lang")]
    pub lang: String,

    /// City used when nothing has been selected yet
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Per-request timeout in seconds (0 disables it)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Shortest query that triggers an autocomplete lookup
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

fn default_forecast_url() -> String {
    "https://api.openweathermap.org/data/2.5/forecast".to_string()
}

fn default_geocoding_url() -> String {
    "https://api-adresse.data.gouv.fr/search/".to_string()
}

fn default_icon_url_template() -> String {
    "https://openweathermap.org/img/wn/{icon}@2x.png".to_string()
}

fn default_lang() -> String {
    "fr".to_string()
}

fn default_city() -> String {
    "Paris".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_min_query_len() -> usize {
    MIN_QUERY_LEN
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
            icon_url_template: default_icon_url_template(),
            units: Units::Metric,
            lang: default_lang(),
            default_city: default_city(),
            request_timeout_secs: default_request_timeout_secs(),
            min_query_len: default_min_query_len(),
        }
    }
}

impl WeatherConfig {
    /// API key from the environment, falling back to the config file.
    pub fn effective_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails; warnings are logged.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);
        self.validate_url(&self.weather.geocoding_url, "weather.geocoding_url", &mut result);

        if !self.weather.icon_url_template.contains("{icon}") {
            result.add_error(
                "weather.icon_url_template",
                "Template must contain the {icon} placeholder",
            );
        }

        if self.weather.default_city.trim().is_empty() {
            result.add_error("weather.default_city", "Default city must not be empty");
        }

        if self.weather.units != Units::Metric {
            result.add_error(
                "weather.units",
                "Only metric units are supported (values are shown in °C, m/s and mm)",
            );
        }

        if self.weather.effective_api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured (set {} or weather.api_key)", API_KEY_ENV),
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout disabled; a hung request never completes",
            );
        }

        if self.weather.min_query_len < MIN_QUERY_LEN {
            result.add_error(
                "weather.min_query_len",
                format!("Must be at least {}", MIN_QUERY_LEN),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
