//! Process configuration, read once at startup from the environment.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Externally reachable base URL, used for provider callback URLs.
    pub public_url: String,
    /// Bearer token for the operator API. Unset means unauthenticated.
    pub api_token: Option<String>,
    pub clock_poll_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        let bind_addr =
            std::env::var("CARECALL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let public_url = std::env::var("CARECALL_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{bind_addr}"));
        let api_token = std::env::var("CARECALL_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let clock_poll_ms = match std::env::var("CARECALL_CLOCK_POLL_MS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid CARECALL_CLOCK_POLL_MS: {raw}")))?,
            Err(_) => 30_000,
        };

        Ok(Self {
            database_url,
            bind_addr,
            public_url,
            api_token,
            clock_poll_ms,
        })
    }
}
