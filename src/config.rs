//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ApiError, Result};

/// Configuration for the HTTP transport, cache and poller.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API gateway, without a trailing slash.
    pub base_url: String,

    /// Bearer token for routes that require authentication.
    pub access_token: Option<String>,

    /// Per-request timeout.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Interval between scan status polls.
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Consecutive poll failures tolerated before the poller stops.
    pub max_poll_errors: u32,

    /// Lifetime of a cached read.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,

    /// Page size for new filter states.
    pub default_page_size: usize,

    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            max_poll_errors: 3,
            cache_ttl: Duration::from_secs(300),
            default_page_size: 10,
            user_agent: concat!("evo-uds-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load from a JSON document. Durations are given in seconds.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| ApiError::validation("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::validation("base_url", "must not be empty"));
        }
        if self.default_page_size == 0 {
            return Err(ApiError::validation("default_page_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn max_poll_errors(mut self, max: u32) -> Self {
        self.config.max_poll_errors = max;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
