//! Configuration module for the canopy backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret expected from the auth gateway (required in production)
    pub gateway_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// District display name used in synthesized feed and notification text
    pub district: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let gateway_psk = env::var("CANOPY_GATEWAY_PSK").ok();

        let db_path = env::var("CANOPY_DB_PATH")
            .unwrap_or_else(|_| "./data/canopy.sqlite".to_string())
            .into();

        let bind_addr = env::var("CANOPY_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid CANOPY_BIND_ADDR format");

        let log_level = env::var("CANOPY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let district = env::var("CANOPY_DISTRICT").unwrap_or_else(|_| "the district".to_string());

        Self {
            gateway_psk,
            db_path,
            bind_addr,
            log_level,
            district,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("CANOPY_GATEWAY_PSK");
        env::remove_var("CANOPY_DB_PATH");
        env::remove_var("CANOPY_BIND_ADDR");
        env::remove_var("CANOPY_LOG_LEVEL");
        env::remove_var("CANOPY_DISTRICT");

        let config = Config::from_env();

        assert!(config.gateway_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/canopy.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.district, "the district");
    }
}
