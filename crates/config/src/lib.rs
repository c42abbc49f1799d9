use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters required by the service.
///
/// The configuration is loaded from environment variables (optionally via a
/// `.env` file) or uses default values if the variable is not set. There is
/// no ambient configuration state: every value here is handed to the
/// component that needs it at construction time.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Simulated cook time per order line during batch processing
    /// (human-friendly format, e.g. "1s", "500ms").
    #[serde(deserialize_with = "deserialize_duration")]
    pub cook_time_per_line: Duration,

    /// How often the kitchen sweep looks for unprocessed orders.
    #[serde(deserialize_with = "deserialize_duration")]
    pub batch_interval: Duration,

    /// Graceful shutdown timeout (human-friendly format, e.g. "5s", "1m").
    #[serde(deserialize_with = "deserialize_duration")]
    pub shutdown_timeout: Duration,
}

/// Custom deserializer for human-readable durations like "5s", "1m".
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from
    /// a `.env` file).
    ///
    /// Fields not set via env keep their default values.
    ///
    /// # Errors
    /// Returns an error if environment variables hold invalid values.
    pub fn load() -> Result<Self> {
        // Load from .env file when present (for container environments)
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("cook_time_per_line", "1s")?
            .set_default("batch_interval", "30s")?
            .set_default("shutdown_timeout", "5s")?
            .add_source(config::Environment::default())
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }
}
