//! Client configuration.

use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Default API host.
pub const DEFAULT_HOST: &str = "app.zencoder.com";

/// Default API version.
pub const DEFAULT_VERSION: u32 = 2;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "Zencoder-Api-Key";

/// Zencoder client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent with every request
    pub api_key: String,
    /// Bare host (`app.zencoder.com`) or full origin (`http://127.0.0.1:8080`)
    pub host: String,
    /// API version, used as `/api/v{version}`
    pub version: u32,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a config with default host, version and timeouts.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: DEFAULT_HOST.to_string(),
            version: DEFAULT_VERSION,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Override the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the API version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("ZENCODER_API_KEY")
            .map_err(|_| ClientError::config("ZENCODER_API_KEY must be set"))?;

        if api_key.trim().is_empty() {
            return Err(ClientError::config("ZENCODER_API_KEY cannot be empty"));
        }

        let timeout_secs: u64 = std::env::var("ZENCODER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let connect_timeout_secs: u64 = std::env::var("ZENCODER_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            api_key,
            host: std::env::var("ZENCODER_HOST")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            version: std::env::var("ZENCODER_API_VERSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_VERSION),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    /// Scheme and authority. Bare hosts are served over HTTPS.
    pub fn origin(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    /// Base URL every route is joined under.
    pub fn base_url(&self) -> String {
        format!("{}/api/v{}", self.origin(), self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "ZENCODER_API_KEY",
            "ZENCODER_HOST",
            "ZENCODER_API_VERSION",
            "ZENCODER_TIMEOUT_SECS",
            "ZENCODER_CONNECT_TIMEOUT_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_base_url_defaults() {
        let config = ClientConfig::new("key");
        assert_eq!(config.base_url(), "https://app.zencoder.com/api/v2");
    }

    #[test]
    fn test_base_url_with_origin_host() {
        let config = ClientConfig::new("key")
            .with_host("http://127.0.0.1:9000/")
            .with_version(3);
        assert_eq!(config.base_url(), "http://127.0.0.1:9000/api/v3");
    }

    #[test]
    #[serial]
    fn test_from_env_requires_api_key() {
        clear_env();
        assert!(ClientConfig::from_env().is_err());

        std::env::set_var("ZENCODER_API_KEY", "  ");
        assert!(ClientConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("ZENCODER_API_KEY", "abc123");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.version, DEFAULT_VERSION);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("ZENCODER_API_KEY", "abc123");
        std::env::set_var("ZENCODER_HOST", "eu.zencoder.com");
        std::env::set_var("ZENCODER_API_VERSION", "1");
        std::env::set_var("ZENCODER_TIMEOUT_SECS", "12");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url(), "https://eu.zencoder.com/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(12));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_invalid_numbers() {
        clear_env();
        std::env::set_var("ZENCODER_API_KEY", "abc123");
        std::env::set_var("ZENCODER_API_VERSION", "two");
        std::env::set_var("ZENCODER_CONNECT_TIMEOUT_SECS", "soon");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.version, DEFAULT_VERSION);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        clear_env();
    }
}
