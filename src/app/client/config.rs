//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! used to talk to the catalog API.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{catalog, http, limits};
use crate::errors::{CatalogError, CatalogResult};

/// Configuration for the catalog HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Catalog API host, e.g. `https://network.tanzu.vmware.com`
    pub host: String,
    /// TCP keep-alive settings
    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    /// Connection pool idle timeout
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// Timeout for API calls
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Timeout for a whole file transfer
    #[serde(with = "humantime_serde")]
    pub download_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Retries for transient failures
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: catalog::DEFAULT_HOST.to_string(),
            tcp_keepalive: Some(Duration::from_secs(30)),
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            download_timeout: Duration::from_secs(4 * 60 * 60),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::MAX_RETRIES,
        }
    }
}

impl ClientConfig {
    /// Point the client at a different catalog host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Builds the HTTP client with the specified configuration
    ///
    /// The per-request timeout is applied by the caller, since API calls and
    /// file transfers need very different limits.
    pub fn build_http_client(&self) -> CatalogResult<Client> {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(Policy::limited(http::MAX_REDIRECTS));

        // Configure TCP keep-alive if specified
        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        // Configure connection pool idle timeout
        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(CatalogError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "https://network.tanzu.vmware.com");
        assert_eq!(config.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert!(config.download_timeout > config.request_timeout);
    }

    #[test]
    fn test_client_config_custom() {
        let config = ClientConfig {
            rate_limit_rps: 10,
            ..Default::default()
        }
        .with_host("http://127.0.0.1:9999");

        assert_eq!(config.rate_limit_rps, 10);
        assert_eq!(config.host, "http://127.0.0.1:9999");
        assert_eq!(config.max_retries, limits::MAX_RETRIES);
    }

    #[test]
    fn test_http_client_creation() {
        let config = ClientConfig::default();
        assert!(config.build_http_client().is_ok());
    }

    #[test]
    fn test_config_toml_durations() {
        let config = ClientConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("request_timeout = \"1m\""));

        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.download_timeout, config.download_timeout);
    }
}
