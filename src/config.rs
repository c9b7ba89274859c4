//! Process configuration
//! Built and validated once at startup; request handling never reads the
//! environment directly.

use hyper::Method;
use thiserror::Error;
use url::Url;

/// Startup configuration failure. Fatal: the process refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing env: {0}")]
    Missing(&'static str),

    #[error("Invalid backing service base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid proxy verb '{0}'")]
    InvalidVerb(String),
}

/// Immutable process-wide proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Absolute URL prefix every inbound request is forwarded to
    pub backing_base_url: String,
    /// Fixed HTTP method used for every outbound call, regardless of the
    /// inbound method
    pub proxy_verb: Method,
    /// Port to listen on
    pub port: u16,
    /// Production mode hides error details from clients
    pub production: bool,
}

impl ProxyConfig {
    /// Validate and construct the configuration
    pub fn new(
        backing_base_url: &str,
        proxy_verb: &str,
        port: u16,
        production: bool,
    ) -> Result<Self, ConfigError> {
        let backing_base_url = backing_base_url.trim();
        if backing_base_url.is_empty() {
            return Err(ConfigError::Missing("BACKING_SERVICE_BASE_URL"));
        }

        let proxy_verb = proxy_verb.trim();
        if proxy_verb.is_empty() {
            return Err(ConfigError::Missing("PROXY_VERB"));
        }

        // Validated here only; request-time URL building stays raw string
        // concatenation against the backing base URL.
        Url::parse(backing_base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: backing_base_url.to_string(),
            reason: e.to_string(),
        })?;

        let verb = Method::from_bytes(proxy_verb.to_ascii_uppercase().as_bytes())
            .map_err(|_| ConfigError::InvalidVerb(proxy_verb.to_string()))?;

        Ok(Self {
            backing_base_url: backing_base_url.to_string(),
            proxy_verb: verb,
            port,
            production,
        })
    }
}
