//! Configuration for the conversion client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default endpoint base URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default per-request timeout; large uploads convert slowly
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the conversion server
    pub base_url: String,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `IMGCONV_SERVER_URL`: Base URL of the conversion server
    /// - `IMGCONV_TIMEOUT_SECS`: Request timeout in seconds
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("IMGCONV_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let timeout = match lookup("IMGCONV_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ClientError::config(format!("IMGCONV_TIMEOUT_SECS is not a number: {raw}")))?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self { base_url, timeout })
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of the conversion route
    #[must_use]
    pub fn convert_url(&self) -> String {
        format!("{}/api/convert", self.base_url.trim_end_matches('/'))
    }

    /// URL of the health route
    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url.trim_end_matches('/'))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ClientError::config("timeout cannot be zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(|key| match key {
            "IMGCONV_SERVER_URL" => Some("https://convert.example.com/".to_string()),
            "IMGCONV_TIMEOUT_SECS" => Some("15".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.convert_url(), "https://convert.example.com/api/convert");
    }

    #[test]
    fn test_from_lookup_bad_timeout() {
        let result = ClientConfig::from_lookup(|key| (key == "IMGCONV_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().with_base_url("").validate().is_err());
        assert!(ClientConfig::default().with_base_url("ftp://host").validate().is_err());
        assert!(ClientConfig::default().with_timeout(Duration::ZERO).validate().is_err());
    }
}
