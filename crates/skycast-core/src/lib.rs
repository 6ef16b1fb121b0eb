pub mod config;
pub mod error;

pub use config::{Config, Units, ValidationResult, WeatherConfig, MIN_QUERY_LEN};
pub use error::{
    AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError, WeatherError,
};

use anyhow::Result;

/// Initialize logging
///
/// Log lines go to stderr so command output on stdout stays machine-readable.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("SkyCast core initialized");
    Ok(())
}
