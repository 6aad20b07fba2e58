use std::collections::HashMap;
use std::time::Duration;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use crate::error::TransportError;

pub const SKYPACK_CDN: &str = "https://cdn.skypack.dev";
pub const JSPM_GENERATOR: &str = "https://api.jspm.io/generate";

/// Settings for outbound provider requests.
///
/// Loaded from the `[resolver]` table of `pinmap.toml` or the global `config.toml`.
/// Requests are never retried: a failing provider is reported to the caller, which may
/// pick another one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Base URL of the Skypack CDN.
    pub skypack_cdn: String,
    /// Endpoint of the jspm import map generator.
    pub jspm_generator: String,
    /// Total time allowed for a single request.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            skypack_cdn: SKYPACK_CDN.to_string(),
            jspm_generator: JSPM_GENERATOR.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("pinmap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The parts of an HTTP response the providers look at.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Issues GET requests on behalf of the provider client.
///
/// Implementations must return non-2xx responses as `Ok`; only failures below the HTTP
/// layer (DNS, TLS, timeouts, ...) are errors.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ResolverConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).query(query).send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: ResolverConfig = toml::from_str("timeout_secs = 5").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.skypack_cdn, SKYPACK_CDN);
        assert_eq!(config.jspm_generator, JSPM_GENERATOR);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut response = HttpResponse::default();
        response.headers.insert("x-pinned-url".to_string(), "/pin/a".to_string());
        assert_eq!(response.header("X-Pinned-URL"), Some("/pin/a"));
        assert_eq!(response.header("x-import-url"), None);
    }

    #[test]
    fn test_reqwest_transport_builds_from_config() {
        assert!(ReqwestTransport::new(&ResolverConfig::default()).is_ok());
    }
}
