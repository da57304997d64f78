//! Configuration management for the storefront engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration for the storefront store
    pub postgres: PostgresConfig,
    /// Ticket notification configuration
    pub notification: NotificationConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Ticket notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// From-address used by real notifier implementations
    pub from_address: String,
    /// Log notifications to the console instead of dispatching them
    pub console_only: bool,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// development defaults. Reads `.env` if present.
    #[must_use]
    pub fn from_env() -> Self {
        // Best-effort: a missing .env file is not an error.
        let _ = dotenvy::dotenv();

        Self {
            postgres: PostgresConfig {
                url: env_or(
                    "STOREFRONT_DATABASE_URL",
                    "postgresql://localhost/storefront",
                ),
                max_connections: env_parse_or("STOREFRONT_DB_MAX_CONNECTIONS", 10),
                connect_timeout: env_parse_or("STOREFRONT_DB_CONNECT_TIMEOUT", 5),
            },
            notification: NotificationConfig {
                from_address: env_or("STOREFRONT_MAIL_FROM", "tickets@storefront.local"),
                console_only: env_parse_or("STOREFRONT_MAIL_CONSOLE_ONLY", true),
            },
            log_level: env_or("STOREFRONT_LOG_LEVEL", "info"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
