//! Configuration for the conversation client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Environment variable overriding the backend base URL.
const API_URL_ENV: &str = "COLLOQUY_API_URL";
/// Environment variable overriding the request timeout (seconds).
const TIMEOUT_ENV: &str = "COLLOQUY_TIMEOUT_SECS";
/// Environment variable overriding the connect timeout (seconds).
const CONNECT_TIMEOUT_ENV: &str = "COLLOQUY_CONNECT_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL could not be parsed.
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// A value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the HTTP client talking to the role/conversation backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Whole-request timeout. Conversation generation is slow, keep it generous.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build a config from the process environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value is malformed or the result fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_ENV) {
            config.base_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.request_timeout = parse_secs(TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(CONNECT_TIMEOUT_ENV) {
            config.connect_timeout = parse_secs(CONNECT_TIMEOUT_ENV, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if the URL is unusable or a timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "connect_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::Invalid(format!("{key}={raw}: {e}")))
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
