// src/config.rs

use std::env;
use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SERVER_PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `postgres://...` selects PostgreSQL, `sqlite:...` the embedded store.
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub rust_log: String,
    pub log_dir: String,
    /// Optional directory with a web front-end, served for unmatched paths.
    pub static_dir: Option<String>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Reads the configuration from the environment (and `.env`, if present).
    ///
    /// `DATABASE_URL` wins; otherwise the URL is assembled from the `DB_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "postgres://{}:{}@{}:{}/{}?sslmode={}",
                    var_or("DB_USER", "postgres"),
                    var_or("DB_PASSWORD", "postgres"),
                    var_or("DB_HOST", "localhost"),
                    var_or("DB_PORT", "5432"),
                    var_or("DB_NAME", "commenttree"),
                    var_or("DB_SSLMODE", "disable"),
                )
            });

        let port = var_or("SERVER_PORT", "8080");
        let server_port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        Ok(Self {
            database_url,
            server_host: var_or("SERVER_HOST", "0.0.0.0"),
            server_port,
            rust_log: var_or("RUST_LOG", "info"),
            log_dir: var_or("LOG_DIR", "logs"),
            static_dir: env::var("STATIC_DIR").ok().filter(|v| !v.is_empty()),
        })
    }

    pub fn is_sqlite(&self) -> bool {
        self.database_url.starts_with("sqlite:")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
