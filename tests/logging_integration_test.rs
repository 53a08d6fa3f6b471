//! Integration tests for logging functionality
//!
//! The global subscriber can be installed once per process, so a single test
//! installs it.

use quarry::config::LoggingConfig;
use quarry::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_is_rejected() {
    let config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    let err = init_logging("verbose", &config).unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_file_logging_creates_directory_and_writes_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("info", &config).unwrap();
    tracing::info!(target: "quarry::tests", table = "staff", rows = 3, "Extracted table");
    drop(guard);

    assert!(log_path.exists());
    let contents = std::fs::read_to_string(log_path.join("quarry.log")).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("Extracted table"))
        .unwrap();
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["fields"]["table"], "staff");
}
