//! Storefront configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use bookstore_db::DbConfig;

/// Storefront configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub max_connections: u32,

    /// How long a writer waits on SQLite's lock before giving up
    pub busy_timeout_secs: u64,

    /// Session lifetime in seconds; 0 means sessions live until logout
    pub session_ttl_secs: i64,

    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("bookstore.db"),
            max_connections: 5,
            busy_timeout_secs: 5,
            session_ttl_secs: 604_800, // 7 days
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let config = AppConfig {
            database_path: env::var("BOOKSTORE_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_var("BOOKSTORE_MAX_CONNECTIONS", defaults.max_connections)?,

            busy_timeout_secs: parse_var("BOOKSTORE_BUSY_TIMEOUT_SECS", defaults.busy_timeout_secs)?,

            session_ttl_secs: parse_var("BOOKSTORE_SESSION_TTL_SECS", defaults.session_ttl_secs)?,

            log_level: env::var("BOOKSTORE_LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "BOOKSTORE_MAX_CONNECTIONS".to_string(),
            ));
        }
        if self.session_ttl_secs < 0 {
            return Err(ConfigError::InvalidValue(
                "BOOKSTORE_SESSION_TTL_SECS".to_string(),
            ));
        }
        Ok(())
    }

    /// `None` when sessions never expire.
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        (self.session_ttl_secs > 0).then(|| chrono::Duration::seconds(self.session_ttl_secs))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
