//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{QuarryConfig, StorageBackend};
use crate::domain::errors::QuarryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`QuarryConfig`]
/// 4. Applies environment variable overrides (`QUARRY_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`QuarryError::Configuration`] if the file is missing or unreadable, a
/// referenced variable is unset, the TOML is malformed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use quarry::config::load_config;
///
/// let config = load_config("quarry.toml").expect("Failed to load config");
/// println!("staging into {}", config.storage.root);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<QuarryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(QuarryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        QuarryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<QuarryConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: QuarryConfig = toml::from_str(&contents)
        .map_err(|e| QuarryError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        QuarryError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| QuarryError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(QuarryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(QuarryError::Configuration(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        QuarryError::Configuration(format!("{name} must be a number, got '{value}'"))
    })
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Applies environment variable overrides using the `QUARRY_*` prefix
///
/// Variables follow the pattern `QUARRY_<SECTION>_<KEY>`, for example
/// `QUARRY_STORAGE_ROOT` or `QUARRY_APPLICATION_DRY_RUN`. A value that cannot be
/// parsed is a configuration error rather than a silent fallback.
fn apply_env_overrides(config: &mut QuarryConfig) -> Result<()> {
    // Application
    if let Some(val) = env("QUARRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("QUARRY_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_bool("QUARRY_APPLICATION_DRY_RUN", &val)?;
    }

    // Databases
    for (section, db) in [
        ("SOURCE", &mut config.source),
        ("WAREHOUSE", &mut config.warehouse),
    ] {
        let key = format!("QUARRY_{section}_SSL_MODE");
        if let Some(val) = env(&key) {
            db.ssl_mode = val;
        }
        let key = format!("QUARRY_{section}_MAX_CONNECTIONS");
        if let Some(val) = env(&key) {
            db.max_connections = parse_number(&key, &val)?;
        }
        let key = format!("QUARRY_{section}_STATEMENT_TIMEOUT_SECONDS");
        if let Some(val) = env(&key) {
            db.statement_timeout_seconds = parse_number(&key, &val)?;
        }
        let key = format!("QUARRY_{section}_CREDENTIALS_PATH");
        if let Some(val) = env(&key) {
            db.credentials.path = Some(val);
        }
    }

    // Storage
    if let Some(val) = env("QUARRY_STORAGE_BACKEND") {
        config.storage.backend = match val.to_ascii_lowercase().as_str() {
            "local" => StorageBackend::Local,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(QuarryError::Configuration(format!(
                    "QUARRY_STORAGE_BACKEND must be 'local' or 'memory', got '{other}'"
                )))
            }
        };
    }
    if let Some(val) = env("QUARRY_STORAGE_ROOT") {
        config.storage.root = val;
    }
    if let Some(val) = env("QUARRY_STORAGE_STATE_KEY") {
        config.storage.state_key = val;
    }

    // Extract
    if let Some(val) = env("QUARRY_EXTRACT_TABLES") {
        config.extract.tables = val
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    // Transform / load
    if let Some(val) = env("QUARRY_TRANSFORM_LOOKUP_HISTORY") {
        config.transform.lookup_history = parse_bool("QUARRY_TRANSFORM_LOOKUP_HISTORY", &val)?;
    }
    if let Some(val) = env("QUARRY_LOAD_APPLY_SCHEMA") {
        config.load.apply_schema = parse_bool("QUARRY_LOAD_APPLY_SCHEMA", &val)?;
    }

    // Notifications
    if let Some(val) = env("QUARRY_NOTIFICATIONS_ENABLED") {
        config.notifications.enabled = parse_bool("QUARRY_NOTIFICATIONS_ENABLED", &val)?;
    }
    if let Some(val) = env("QUARRY_NOTIFICATIONS_WEBHOOK_URL") {
        config.notifications.webhook_url = Some(val);
    }

    // Logging
    if let Some(val) = env("QUARRY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_bool("QUARRY_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env("QUARRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
