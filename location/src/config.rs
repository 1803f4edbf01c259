use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LocationRequest;
use crate::retry::DEFAULT_RETRY_LIMIT;

/// Errors produced while loading a [`LocatorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be parsed.
    #[error("invalid locator config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The retry limit must allow at least one batch.
    #[error("retry_limit must be at least 1")]
    ZeroRetryLimit,
    /// The fastest interval may not exceed the update interval.
    #[error("fastest_interval_ms ({fastest}) exceeds update_interval_ms ({update})")]
    IntervalOrder {
        /// Configured fastest interval.
        fastest: u64,
        /// Configured update interval.
        update: u64,
    },
}

/// Tunables of the location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Request used for settings checks, update streams and retry sessions.
    pub request: LocationRequest,
    /// Number of update batches a retry session may consume.
    pub retry_limit: u32,
}

impl LocatorConfig {
    /// Parses and validates a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the source cannot work with.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_limit == 0 {
            return Err(ConfigError::ZeroRetryLimit);
        }
        if self.request.fastest_interval_ms > self.request.update_interval_ms {
            return Err(ConfigError::IntervalOrder {
                fastest: self.request.fastest_interval_ms,
                update: self.request.update_interval_ms,
            });
        }
        Ok(())
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            request: LocationRequest::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}
