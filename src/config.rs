//! Configuration management for the object-group client

use crate::error::{GroupOpError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for talking to the cluster and waiting on jobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Cluster gateway URL (default: http://127.0.0.1:8080)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in milliseconds (default: 30000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Job status polling behavior
    #[serde(default)]
    pub poll: PollConfig,

    /// Timeout used by `wait` when the caller does not pass one (default: 30000)
    #[serde(default = "default_wait_timeout_ms")]
    pub default_wait_timeout_ms: u64,

    /// Entries per listing page, 0 lets the cluster decide (default: 0)
    #[serde(default)]
    pub list_page_size: usize,

    /// Whether to register Prometheus metrics (default: false)
    #[serde(default)]
    pub enable_metrics: bool,
}

/// Configuration for job status polling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    /// First interval between polls in milliseconds (default: 200)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for the backed-off interval (default: 2000)
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,

    /// Multiplier applied to the interval after each non-terminal poll (default: 2)
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    /// Consecutive failed polls tolerated before giving up (default: 3)
    #[serde(default = "default_max_poll_retries")]
    pub max_poll_retries: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            backoff_factor: default_backoff_factor(),
            max_poll_retries: default_max_poll_retries(),
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(GroupOpError::ConfigError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(GroupOpError::ConfigError(format!(
                "max_poll_interval_ms ({}) must be >= poll_interval_ms ({})",
                self.max_poll_interval_ms, self.poll_interval_ms
            )));
        }

        if self.backoff_factor == 0 {
            return Err(GroupOpError::ConfigError(
                "backoff_factor must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_endpoint() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_max_poll_interval_ms() -> u64 {
    2_000
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_max_poll_retries() -> usize {
    3
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
            poll: PollConfig::default(),
            default_wait_timeout_ms: default_wait_timeout_ms(),
            list_page_size: 0,
            enable_metrics: false,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `endpoint` with every other field defaulted
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` if loading and validation succeed
    /// * `Err(GroupOpError)` if file cannot be read or config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GroupOpError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(content).map_err(|e| {
            GroupOpError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - endpoint must be an http or https URL
    /// - request_timeout_ms must be > 0
    /// - poll settings must be consistent
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            GroupOpError::ConfigError(format!("Invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GroupOpError::ConfigError(format!(
                "endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.request_timeout_ms == 0 {
            return Err(GroupOpError::ConfigError(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        self.poll.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn default_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.default_wait_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.max_poll_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = ClientConfig::from_yaml(
            r#"
endpoint: "http://gateway:51080"
poll:
  poll_interval_ms: 50
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "http://gateway:51080");
        assert_eq!(config.poll.poll_interval_ms, 50);
        assert_eq!(config.poll.max_poll_interval_ms, 2_000);
        assert_eq!(config.default_wait_timeout_ms, 30_000);
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = ClientConfig::with_endpoint("not a url");
        assert!(matches!(config.validate(), Err(GroupOpError::ConfigError(_))));

        let config = ClientConfig::with_endpoint("ftp://gateway");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_poll_settings() {
        let mut config = ClientConfig::default();
        config.poll.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.poll.max_poll_interval_ms = 10;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.poll.backoff_factor = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = ClientConfig::default();
        config.request_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
