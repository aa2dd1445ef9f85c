//! Configuration management for the client.

use std::env;
use std::time::Duration;

use crate::catalog::DEFAULT_BASE_URL;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// User to start the sync session for
    pub user_id: String,
    /// OMDb API key; catalog search is disabled without one
    pub omdb_api_key: Option<String>,
    /// OMDb endpoint
    pub omdb_base_url: String,
    /// Upper bound for every remote call
    pub remote_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let user_id = lookup("REELMARK_USER_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingUserId)?;

        let omdb_api_key = lookup("OMDB_API_KEY").filter(|v| !v.trim().is_empty());

        let omdb_base_url =
            lookup("OMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let remote_timeout = lookup("REMOTE_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::InvalidTimeout)?;

        Ok(Self {
            user_id,
            omdb_api_key,
            omdb_base_url,
            remote_timeout,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REELMARK_USER_ID environment variable is required")]
    MissingUserId,

    #[error("Invalid REMOTE_TIMEOUT_MS value")]
    InvalidTimeout,
}
