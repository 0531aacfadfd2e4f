//! Monitor settings loaded from YAML
//!
//! ```yaml
//! url: wss://push.example.com/ws
//! log_level: info
//! resources:
//!   - loans
//! manager:
//!   max_reconnect_attempts: 10
//!   heartbeat_interval_ms: 15000
//! ```

use livesocket::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable that replaces the configured URL
pub const URL_ENV_VAR: &str = "LIVESOCKET_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Push service endpoint
    #[serde(default)]
    pub url: String,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Resources to subscribe to once connected
    #[serde(default)]
    pub resources: Vec<String>,
    /// Connection manager tuning
    #[serde(default)]
    pub manager: ManagerConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl MonitorConfig {
    /// Load configuration from a YAML file and the environment
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: MonitorConfig = serde_yaml::from_str(&yaml_content)?;

        // Load .env file
        dotenv::dotenv().ok();

        if let Ok(url) = std::env::var(URL_ENV_VAR) {
            info!("Overriding URL from environment variable");
            config.url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML without consulting the environment
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let config: MonitorConfig = serde_yaml::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "url cannot be empty (set it in the file or via {})",
                URL_ENV_VAR
            )));
        }
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }
        if self.resources.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "resources cannot contain empty names".to_string(),
            ));
        }
        self.manager
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  URL: {}", self.url);
        info!("  Log level: {}", self.log_level);
        info!("  Resources: {:?}", self.resources);
        match self.manager.max_reconnect_attempts {
            Some(max) => info!("  Max reconnect attempts: {}", max),
            None => info!("  Max reconnect attempts: unlimited"),
        }
        info!("  Heartbeat interval: {:?}", self.manager.heartbeat_interval);
        info!("  Batching: {}", self.manager.enable_batching);
    }
}
