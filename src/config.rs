//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default Graph API endpoint for outbound WhatsApp traffic.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Path of the SQLite database file.
    pub db_path: PathBuf,

    /// Base URL of the provider Graph API (overridable for tests/staging).
    pub graph_base_url: String,
}

impl Config {
    /// Load configuration from environment variables, applying defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = env::var("MSGBRIDGE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "MSGBRIDGE_BIND".to_string(),
                message: format!("{bind:?} is not a socket address: {e}"),
            })?;

        let db_path = env::var("MSGBRIDGE_DB_PATH")
            .unwrap_or_else(|_| "./data/msgbridge.db".to_string())
            .into();

        let graph_base_url = env::var("MSGBRIDGE_GRAPH_BASE")
            .unwrap_or_else(|_| DEFAULT_GRAPH_BASE_URL.to_string());

        Ok(Self {
            bind_addr,
            db_path,
            graph_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        // Env vars are process-global; only assert on keys the test suite
        // never sets.
        let config = Config::from_env().unwrap();
        assert_eq!(config.graph_base_url, DEFAULT_GRAPH_BASE_URL);
        assert_eq!(config.bind_addr.port(), 8080);
    }
}
