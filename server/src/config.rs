//! Configuration management

use serde::{Deserialize, Serialize};

use fleetops_core::{
    Error, Result, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONCURRENCY, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_LIVENESS_COMMAND,
};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Records per sweep page
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Concurrent SSH sessions per sweep
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// SSH connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Remote command timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Command used to probe server liveness
    #[serde(default = "default_liveness_command")]
    pub liveness_command: String,

    /// Cron expression for the server status sweep
    #[serde(default = "default_server_sweep")]
    pub server_sweep_cron: String,

    /// Cron expression for the service status sweep
    #[serde(default = "default_service_sweep")]
    pub service_sweep_cron: String,
}

fn default_database_url() -> String {
    "sqlite:data/fleetops.db".to_string()
}

fn default_page_size() -> i64 {
    50
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_liveness_command() -> String {
    DEFAULT_LIVENESS_COMMAND.to_string()
}

fn default_server_sweep() -> String {
    // Every 5 minutes
    "0 */5 * * * *".to_string()
}

fn default_service_sweep() -> String {
    // Every 10 minutes
    "0 */10 * * * *".to_string()
}

impl Config {
    /// Load configuration from file or environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            Self::load_from_file(p)
        } else {
            Self::load_from_env()
        }
    }

    /// Load from configuration file
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    fn load_from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url());

        Ok(Config {
            database_url,
            page_size: env_or("FLEETOPS_PAGE_SIZE", default_page_size())?,
            concurrency: env_or("FLEETOPS_CONCURRENCY", default_concurrency())?,
            connect_timeout_secs: env_or("FLEETOPS_CONNECT_TIMEOUT", default_connect_timeout())?,
            command_timeout_secs: env_or("FLEETOPS_COMMAND_TIMEOUT", default_command_timeout())?,
            liveness_command: std::env::var("FLEETOPS_LIVENESS_COMMAND")
                .unwrap_or_else(|_| default_liveness_command()),
            server_sweep_cron: std::env::var("FLEETOPS_SERVER_SWEEP_CRON")
                .unwrap_or_else(|_| default_server_sweep()),
            service_sweep_cron: std::env::var("FLEETOPS_SERVICE_SWEEP_CRON")
                .unwrap_or_else(|_| default_service_sweep()),
        })
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("Invalid value for {}: {}", var, raw))),
        Err(_) => Ok(default),
    }
}
