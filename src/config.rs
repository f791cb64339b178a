use crate::error::{MirageError, Result};
use std::env;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Proxy server configuration
    pub server: ServerConfig,
    /// Outbound fetch configuration
    pub fetch: FetchConfig,
    /// Challenge-solver configuration
    pub solver: SolverConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (default: 8080)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Outbound fetch timeout in seconds
    pub timeout: u64,
    /// Value for the X-Proxied-By response header
    pub identifier: String,
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Base URL of the external challenge-solving service
    pub base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let port = get_env_or("PORT", "8080")
            .parse()
            .map_err(|_| MirageError::InvalidConfig("PORT must be a valid port number".into()))?;

        let timeout: u64 = get_env_or("PROXY_FETCH_TIMEOUT", "30").parse().map_err(|_| {
            MirageError::InvalidConfig("PROXY_FETCH_TIMEOUT must be a number of seconds".into())
        })?;
        if timeout == 0 {
            return Err(MirageError::InvalidConfig(
                "PROXY_FETCH_TIMEOUT must be greater than zero".into(),
            ));
        }

        let base_url = get_env_or(
            "SOLVER_BASE_URL",
            "https://recaptcha.uraverageopdoge.workers.dev",
        );
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            MirageError::InvalidConfig(format!("SOLVER_BASE_URL must be a valid URL: {}", e))
        })?;

        Ok(Config {
            server: ServerConfig {
                port,
                host: get_env_or("PROXY_HOST", "0.0.0.0"),
            },
            fetch: FetchConfig {
                timeout,
                identifier: get_env_or("PROXY_IDENTIFIER", "Mirage Proxy"),
            },
            solver: SolverConfig { base_url },
        })
    }

    /// Get the listen address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
