//! Integration test: Configuration utilities
//!
//! Tests the bin_common path resolution and settings loading.

use livesocket_monitor::bin_common::{
    load_config_from_env, resolve_config_path, ConfigError, ConfigType, MonitorConfig,
};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_custom_config() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let config_path = load_config_from_env(custom);

    // Unless the variable is set by the environment running the tests
    if env::var("MONITOR_CONFIG_PATH").is_err() {
        assert_eq!(config_path.to_str().unwrap(), "custom/path.yaml");
    }
}

#[test]
fn test_config_type_env_var_names() {
    assert_eq!(ConfigType::Monitor.env_var_name(), "MONITOR_CONFIG_PATH");
}

#[test]
fn test_cli_argument_overrides_environment() {
    let args = vec!["from/args.yaml".to_string()];
    let config_path = resolve_config_path(&args, ConfigType::Monitor);
    assert_eq!(config_path, PathBuf::from("from/args.yaml"));
}

#[test]
fn test_shipped_config_is_valid() {
    let yaml = std::fs::read_to_string(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/monitor.yaml"),
    )
    .unwrap();
    let config = MonitorConfig::from_yaml(&yaml).unwrap();

    assert_eq!(config.url, "ws://localhost:3001/ws");
    assert_eq!(config.resources, vec!["notifications".to_string()]);
    assert_eq!(config.manager.max_reconnect_attempts, Some(10));
    assert_eq!(config.manager.heartbeat_interval, Duration::from_secs(30));
}

#[test]
fn test_load_from_file() {
    let file = write_yaml(
        r#"
url: ws://push.test/ws
log_level: debug
resources: [loans, alerts]
manager:
  pong_timeout_ms: 45000
  enable_batching: true
  batch_max_size: 20
"#,
    );

    let config = MonitorConfig::load(file.path()).unwrap();
    if env::var("LIVESOCKET_URL").is_err() {
        assert_eq!(config.url, "ws://push.test/ws");
    }
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.resources, vec!["loans", "alerts"]);
    assert_eq!(config.manager.pong_timeout, Some(Duration::from_secs(45)));
    assert!(config.manager.enable_batching);
    assert_eq!(config.manager.batch_max_size, Some(20));
}

#[test]
fn test_missing_file_is_file_error() {
    let err = MonitorConfig::load("does/not/exist.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileError(_)));
}

#[test]
fn test_malformed_yaml_is_yaml_error() {
    let file = write_yaml("url: [unclosed");
    let err = MonitorConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlError(_)));
}

#[test]
fn test_invalid_manager_settings_rejected() {
    let err = MonitorConfig::from_yaml(
        r#"
url: ws://push.test/ws
manager:
  reconnect_interval_ms: 5000
  max_reconnect_interval_ms: 1000
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn test_empty_url_rejected() {
    let err = MonitorConfig::from_yaml("log_level: info").unwrap_err();
    assert!(err.to_string().contains("LIVESOCKET_URL"));
}
