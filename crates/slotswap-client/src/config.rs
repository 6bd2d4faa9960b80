//! Client configuration.

use thiserror::Error;
use url::Url;

/// Server base used when [`API_BASE_ENV`] is unset.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Environment variable naming the server base URL.
pub const API_BASE_ENV: &str = "SLOTSWAP_API_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base `{value}`: {source}")]
    InvalidBase {
        value: String,
        source: url::ParseError,
    },

    #[error("API base `{0}` cannot carry a websocket endpoint")]
    UnsupportedScheme(Url),
}

/// Where the server lives. One base URL drives both the REST client and the
/// websocket endpoint derived from it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
}

impl ClientConfig {
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(api_base).map_err(|source| ConfigError::InvalidBase {
            value: api_base.to_string(),
            source,
        })?;
        Ok(Self { api_base: parsed })
    }

    /// Reads [`API_BASE_ENV`], falling back to the localhost default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = std::env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(&base)
    }

    /// Websocket endpoint derived from the API base: `http` becomes `ws`,
    /// `https` becomes `wss`, and `/ws` is appended to the path.
    pub fn ws_endpoint(&self) -> Result<Url, ConfigError> {
        let mut endpoint = self.api_base.clone();
        let scheme = match endpoint.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(ConfigError::UnsupportedScheme(self.api_base.clone())),
        };
        if endpoint.set_scheme(scheme).is_err() {
            return Err(ConfigError::UnsupportedScheme(self.api_base.clone()));
        }
        endpoint
            .path_segments_mut()
            .map_err(|_| ConfigError::UnsupportedScheme(self.api_base.clone()))?
            .pop_if_empty()
            .push("ws");
        Ok(endpoint)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default base URL is valid"),
        }
    }
}
