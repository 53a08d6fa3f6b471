//! Configuration schema types
//!
//! This module defines the configuration structure for Quarry. Every section has
//! serde defaults so a minimal file (or none of a section) is valid.

use crate::config::SecretString;
use crate::domain::SourceTable;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main Quarry configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Operational (source) database
    #[serde(default = "DatabaseConfig::source")]
    pub source: DatabaseConfig,

    /// Analytical warehouse database
    #[serde(default = "DatabaseConfig::warehouse")]
    pub warehouse: DatabaseConfig,

    /// Staged object storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Extraction settings
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Transformation settings
    #[serde(default)]
    pub transform: TransformConfig,

    /// Load settings
    #[serde(default)]
    pub load: LoadConfig,

    /// Notification channel
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            application: ApplicationConfig::default(),
            source: DatabaseConfig::source(),
            warehouse: DatabaseConfig::warehouse(),
            storage: StorageConfig::default(),
            extract: ExtractConfig::default(),
            transform: TransformConfig::default(),
            load: LoadConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl QuarryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate("source")?;
        self.warehouse.validate("warehouse")?;
        self.storage.validate()?;
        self.extract.validate()?;
        self.notifications.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (query and transform, but write nothing)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Where database credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Environment variables `{prefix}USER`, `{prefix}PASSWORD`, ...
    #[default]
    Env,
    /// JSON secret document on disk
    File,
    /// Values written directly in this file
    Inline,
}

/// Database credential settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Credential provider
    #[serde(default)]
    pub provider: CredentialSource,

    /// Environment variable prefix for the `env` provider
    #[serde(default)]
    pub env_prefix: Option<String>,

    /// Secret document path for the `file` provider
    #[serde(default)]
    pub path: Option<String>,

    /// Host for the `inline` provider
    #[serde(default)]
    pub host: Option<String>,

    /// Port for the `inline` provider
    #[serde(default)]
    pub port: Option<u16>,

    /// User for the `inline` provider
    #[serde(default)]
    pub user: Option<String>,

    /// Password for the `inline` provider
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Database name for the `inline` provider
    #[serde(default)]
    pub database: Option<String>,
}

/// PostgreSQL connection settings shared by the source and the warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Credential provider settings
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Maximum number of connections in the pool
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_pg_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,

    /// Statement timeout in seconds
    #[serde(default = "default_pg_statement_timeout_seconds")]
    pub statement_timeout_seconds: u64,

    /// TLS mode
    #[serde(default = "default_pg_ssl_mode")]
    pub ssl_mode: String,
}

impl DatabaseConfig {
    /// Defaults for the `[source]` section (credentials from `DB_*`)
    pub fn source() -> Self {
        Self::with_prefix("DB_")
    }

    /// Defaults for the `[warehouse]` section (credentials from `WAREHOUSE_DB_*`)
    pub fn warehouse() -> Self {
        Self::with_prefix("WAREHOUSE_DB_")
    }

    fn with_prefix(prefix: &str) -> Self {
        Self {
            credentials: CredentialsConfig {
                env_prefix: Some(prefix.to_string()),
                ..CredentialsConfig::default()
            },
            max_connections: default_pg_max_connections(),
            connection_timeout_seconds: default_pg_connection_timeout_seconds(),
            statement_timeout_seconds: default_pg_statement_timeout_seconds(),
            ssl_mode: default_pg_ssl_mode(),
        }
    }

    fn validate(&self, section: &str) -> Result<(), String> {
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(format!(
                "{section}.max_connections must be between 1 and 100, got {}",
                self.max_connections
            ));
        }

        if self.connection_timeout_seconds == 0 {
            return Err(format!("{section}.connection_timeout_seconds must be > 0"));
        }

        let valid_ssl_modes = [
            "disable",
            "allow",
            "prefer",
            "require",
            "verify-ca",
            "verify-full",
        ];
        if !valid_ssl_modes.contains(&self.ssl_mode.as_str()) {
            return Err(format!(
                "{section}.ssl_mode must be one of: {}, got '{}'",
                valid_ssl_modes.join(", "),
                self.ssl_mode
            ));
        }

        let creds = &self.credentials;
        match creds.provider {
            CredentialSource::Env => {}
            CredentialSource::File => {
                if creds.path.as_deref().map_or(true, str::is_empty) {
                    return Err(format!(
                        "{section}.credentials.path is required when provider = 'file'"
                    ));
                }
            }
            CredentialSource::Inline => {
                let missing: Vec<&str> = [
                    ("host", creds.host.is_none()),
                    ("user", creds.user.is_none()),
                    ("password", creds.password.is_none()),
                    ("database", creds.database.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();
                if !missing.is_empty() {
                    return Err(format!(
                        "{section}.credentials missing inline values: {}",
                        missing.join(", ")
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::source()
    }
}

/// Object storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directory tree on the local filesystem
    #[default]
    Local,
    /// Process memory (tests and dry experiments)
    Memory,
}

/// Staged object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// Bucket root directory for the local backend
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Key prefix for raw batches
    #[serde(default = "default_raw_prefix")]
    pub raw_prefix: String,

    /// Key prefix for transformed batches
    #[serde(default = "default_processed_prefix")]
    pub processed_prefix: String,

    /// Key of the persisted watermark map
    #[serde(default = "default_state_key")]
    pub state_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            raw_prefix: default_raw_prefix(),
            processed_prefix: default_processed_prefix(),
            state_key: default_state_key(),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.backend == StorageBackend::Local && self.root.trim().is_empty() {
            return Err("storage.root cannot be empty for the local backend".to_string());
        }
        for (name, value) in [
            ("raw_prefix", &self.raw_prefix),
            ("processed_prefix", &self.processed_prefix),
            ("state_key", &self.state_key),
        ] {
            if value.trim_matches('/').is_empty() {
                return Err(format!("storage.{name} cannot be empty"));
            }
        }
        if self.raw_prefix.trim_matches('/') == self.processed_prefix.trim_matches('/') {
            return Err("storage.raw_prefix and storage.processed_prefix must differ".to_string());
        }
        Ok(())
    }
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractConfig {
    /// Tables to extract (empty means every allow-listed table)
    #[serde(default)]
    pub tables: Vec<String>,
}

impl ExtractConfig {
    /// Resolves the configured table names against the allow-list
    ///
    /// # Errors
    ///
    /// Returns the validation error of the first name outside the allow-list
    pub fn resolved_tables(&self) -> crate::domain::Result<Vec<SourceTable>> {
        if self.tables.is_empty() {
            return Ok(SourceTable::ALL.to_vec());
        }
        let mut tables = self
            .tables
            .iter()
            .map(|name| SourceTable::from_str(name))
            .collect::<crate::domain::Result<Vec<_>>>()?;
        tables.dedup();
        Ok(tables)
    }

    fn validate(&self) -> Result<(), String> {
        self.resolved_tables()
            .map(|_| ())
            .map_err(|e| format!("extract.tables: {e}"))
    }
}

/// Transformation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Resolve lookups against every staged address/department batch,
    /// not only the ones produced in the current cycle
    #[serde(default = "default_true")]
    pub lookup_history: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            lookup_history: true,
        }
    }
}

/// Load configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoadConfig {
    /// Apply the bundled warehouse DDL before loading
    #[serde(default)]
    pub apply_schema: bool,
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Send notifications at all
    #[serde(default)]
    pub enabled: bool,

    /// Webhook receiving JSON `{subject, message}`; log-only when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds
    #[serde(default = "default_notification_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            timeout_seconds: default_notification_timeout_seconds(),
        }
    }
}

impl NotificationConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.webhook_url {
            let parsed = url::Url::parse(url)
                .map_err(|e| format!("notifications.webhook_url is invalid: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!(
                    "notifications.webhook_url must be http or https, got '{}'",
                    parsed.scheme()
                ));
            }
        }
        if self.timeout_seconds == 0 {
            return Err("notifications.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".into());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_storage_root() -> String {
    "./quarry-data".to_string()
}

fn default_raw_prefix() -> String {
    "ingestion".to_string()
}

fn default_processed_prefix() -> String {
    "processed".to_string()
}

fn default_state_key() -> String {
    "state/last_updated.json".to_string()
}

fn default_notification_timeout_seconds() -> u64 {
    10
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_pg_max_connections() -> usize {
    4
}

fn default_pg_connection_timeout_seconds() -> u64 {
    30
}

fn default_pg_statement_timeout_seconds() -> u64 {
    60
}

fn default_pg_ssl_mode() -> String {
    "prefer".to_string()
}
