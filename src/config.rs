//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

use crate::services::transfer_service::OverdraftPolicy;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required for the postgres backend)
/// - `SERVER_ADDRESS` (optional): listen address, defaults to `0.0.0.0:8080`
/// - `TOKEN_SYMMETRIC_KEY` (required): at least 32 bytes
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 10
/// - `TX_TIMEOUT_MS` (optional): roll back transactions running longer than this
/// - `ALLOW_OVERDRAFT` (optional): defaults to true
/// - `STORE_BACKEND` (optional): `postgres` (default) or `memory`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_server_address")]
    pub server_address: String,

    pub token_symmetric_key: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default)]
    pub tx_timeout_ms: Option<u64>,

    #[serde(default = "default_allow_overdraft")]
    pub allow_overdraft: bool,

    #[serde(default = "default_store_backend")]
    pub store_backend: String,
}

/// Which `Store` implementation the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("unknown STORE_BACKEND: {0}")]
    UnknownBackend(String),

    #[error("DATABASE_URL is required for the postgres backend")]
    MissingDatabaseUrl,
}

fn default_server_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_allow_overdraft() -> bool {
    true
}

fn default_store_backend() -> String {
    "postgres".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., TOKEN_SYMMETRIC_KEY)
    /// - Environment variable values cannot be parsed into expected types
    /// - The backend is unknown, or postgres is selected without DATABASE_URL
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store_backend()? == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(())
    }

    pub fn store_backend(&self) -> Result<StoreBackend, ConfigError> {
        match self.store_backend.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    pub fn tx_timeout(&self) -> Option<Duration> {
        self.tx_timeout_ms.map(Duration::from_millis)
    }

    pub fn overdraft_policy(&self) -> OverdraftPolicy {
        if self.allow_overdraft {
            OverdraftPolicy::Allow
        } else {
            OverdraftPolicy::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
    }

    #[test]
    fn defaults_apply() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/bank"),
            ("TOKEN_SYMMETRIC_KEY", "12345678901234567890123456789012"),
        ])
        .unwrap();

        assert_eq!(config.server_address, "0.0.0.0:8080");
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.tx_timeout(), None);
        assert_eq!(config.overdraft_policy(), OverdraftPolicy::Allow);
        assert_eq!(config.store_backend().unwrap(), StoreBackend::Postgres);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn token_lifetime_is_not_server_config() {
        // The server only verifies tokens; a lifetime variable has no field to land in.
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/bank"),
            ("TOKEN_SYMMETRIC_KEY", "12345678901234567890123456789012"),
            ("ACCESS_TOKEN_DURATION_SECS", "not-a-number"),
        ]);

        assert!(config.is_ok());
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = from_pairs(&[
            ("TOKEN_SYMMETRIC_KEY", "12345678901234567890123456789012"),
            ("STORE_BACKEND", "memory"),
            ("ALLOW_OVERDRAFT", "false"),
            ("TX_TIMEOUT_MS", "250"),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.store_backend().unwrap(), StoreBackend::Memory);
        assert_eq!(config.overdraft_policy(), OverdraftPolicy::Reject);
        assert_eq!(config.tx_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let config = from_pairs(&[("TOKEN_SYMMETRIC_KEY", "12345678901234567890123456789012")])
            .unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config = from_pairs(&[
            ("TOKEN_SYMMETRIC_KEY", "12345678901234567890123456789012"),
            ("STORE_BACKEND", "redis"),
        ])
        .unwrap();

        assert!(matches!(
            config.store_backend(),
            Err(ConfigError::UnknownBackend(name)) if name == "redis"
        ));
    }
}
