//! Configuration management for Quarry.
//!
//! Quarry reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `QUARRY_<SECTION>_<KEY>` overrides
//! - Default values for every optional setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quarry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//! println!("State key: {}", config.storage.state_key);
//! println!("Tables: {:?}", config.extract.resolved_tables()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level and dry-run switch
//! - [`DatabaseConfig`] - `[source]` and `[warehouse]` connection settings
//! - [`StorageConfig`] - staged object storage and watermark key
//! - [`ExtractConfig`], [`TransformConfig`], [`LoadConfig`] - per-stage settings
//! - [`NotificationConfig`] - notification channel
//! - [`LoggingConfig`] - log file output
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [source.credentials]
//! provider = "env"        # DB_HOST, DB_PORT, DB_USER, DB_PASSWORD, DB_NAME
//!
//! [warehouse.credentials]
//! provider = "file"
//! path = "/run/secrets/warehouse.json"
//!
//! [storage]
//! root = "/srv/quarry/bucket"
//!
//! [notifications]
//! enabled = true
//! webhook_url = "${QUARRY_WEBHOOK_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CredentialSource, CredentialsConfig, DatabaseConfig, ExtractConfig,
    LoadConfig, LoggingConfig, NotificationConfig, QuarryConfig, StorageBackend, StorageConfig,
    TransformConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
