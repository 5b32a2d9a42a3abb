//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FARMART_API_BASE` - Marketplace API base URL (default: <http://localhost:5002>)
//! - `FARMART_DATA_DIR` - Durable local storage directory (default: .farmart)
//! - `FARMART_POLL_INTERVAL_SECS` - Payment poll interval (default: 5)
//! - `FARMART_POLL_MAX_ATTEMPTS` - Payment poll attempt budget (default: 24)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default API base used in development, matching the local API server.
const DEV_API_BASE: &str = "http://localhost:5002";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Farmart client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the marketplace REST API.
    pub api_base: String,
    /// Directory holding the durable local store (cart, address, search).
    pub data_dir: PathBuf,
    /// Payment confirmation polling configuration.
    pub polling: PollingConfig,
}

/// Payment confirmation polling configuration.
///
/// The defaults give roughly two minutes of confirmation window
/// (24 attempts x 5 seconds). Tests shrink the interval to run the real
/// loop in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct PollingConfig {
    /// Fixed interval between status polls. No backoff.
    pub interval: Duration,
    /// Maximum number of polls before an attempt times out.
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 24,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base = get_env_or_default("FARMART_API_BASE", DEV_API_BASE);
        url::Url::parse(&api_base)
            .map_err(|e| ConfigError::InvalidEnvVar("FARMART_API_BASE".to_owned(), e.to_string()))?;
        let data_dir = PathBuf::from(get_env_or_default("FARMART_DATA_DIR", ".farmart"));

        let interval_secs = get_env_or_default("FARMART_POLL_INTERVAL_SECS", "5")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FARMART_POLL_INTERVAL_SECS".to_owned(), e.to_string())
            })?;
        let max_attempts = get_env_or_default("FARMART_POLL_MAX_ATTEMPTS", "24")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FARMART_POLL_MAX_ATTEMPTS".to_owned(), e.to_string())
            })?;

        Ok(Self {
            api_base,
            data_dir,
            polling: PollingConfig {
                interval: Duration::from_secs(interval_secs),
                max_attempts,
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
pub(crate) fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_polling_budget() {
        let polling = PollingConfig::default();
        assert_eq!(polling.interval, Duration::from_secs(5));
        assert_eq!(polling.max_attempts, 24);
    }
}
