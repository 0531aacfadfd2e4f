//! CLI utilities for binaries
//!
//! Handles configuration path resolution from arguments and
//! environment variables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Monitor configuration (config/monitor.yaml)
    Monitor,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Monitor => "config/monitor.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Monitor | ConfigType::Custom(_) => "MONITOR_CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use livesocket_monitor::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Monitor);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Pick the config path: first CLI argument, then environment, then default
pub fn resolve_config_path(args: &[String], config_type: ConfigType) -> PathBuf {
    match args.first() {
        Some(path) => PathBuf::from(path),
        None => load_config_from_env(config_type),
    }
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
