//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Recurrence processing configuration.
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Recurrence processing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecurrenceConfig {
    /// Default preview horizon in months.
    #[serde(default = "default_preview_months")]
    pub preview_months: u32,
    /// Interval between scheduled batch runs, in seconds.
    #[serde(default = "default_batch_interval")]
    pub batch_interval_secs: u64,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            preview_months: default_preview_months(),
            batch_interval_secs: default_batch_interval(),
        }
    }
}

fn default_preview_months() -> u32 {
    12
}

fn default_batch_interval() -> u64 {
    3600 // hourly
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Upper bound on a single persistence call, in milliseconds.
    /// Calls exceeding this are treated as retryable timeouts, never as a
    /// silent ledger mutation.
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            op_timeout_ms: default_op_timeout(),
        }
    }
}

fn default_op_timeout() -> u64 {
    5000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
