//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::cli::commands::common::EXIT_CONFIG;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "quarry.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Quarry configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - DB_HOST, DB_PORT, DB_USER, DB_PASSWORD, DB_NAME (source)");
                println!("     - WAREHOUSE_DB_HOST, ... WAREHOUSE_DB_NAME (warehouse)");
                println!("  3. Validate configuration: quarry validate-config");
                println!("  4. Run the pipeline: quarry run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Quarry Configuration File

[application]
log_level = "info"
dry_run = false

[source]
ssl_mode = "prefer"

[source.credentials]
provider = "env"
env_prefix = "DB_"

[warehouse]
ssl_mode = "prefer"

[warehouse.credentials]
provider = "env"
env_prefix = "WAREHOUSE_DB_"

[storage]
backend = "local"
root = "./quarry-data"

[load]
apply_schema = false

[notifications]
enabled = false

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with every option and comments
    fn generate_config_with_examples() -> String {
        r#"# Quarry Configuration File
#
# Incremental extraction from an operational PostgreSQL database into a
# star-schema warehouse. Values of the form ${VAR} are substituted from the
# environment; QUARRY_<SECTION>_<KEY> variables override any setting.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (query and transform, but write nothing)
dry_run = false

# ============================================================================
# Source Database
# ============================================================================
[source]
# Connection pool settings
max_connections = 4
connection_timeout_seconds = 30
statement_timeout_seconds = 60

# SSL/TLS mode: disable | allow | prefer | require | verify-ca | verify-full
ssl_mode = "prefer"

[source.credentials]
# Credential provider: env | file | inline
provider = "env"

# env: reads {prefix}HOST, {prefix}PORT, {prefix}USER, {prefix}PASSWORD, {prefix}NAME
env_prefix = "DB_"

# file: JSON document with host, port, user, password, database
# path = "/run/secrets/source.json"

# inline:
# host = "localhost"
# port = 5432
# user = "quarry"
# password = "${SOURCE_PASSWORD}"
# database = "totesys"

# ============================================================================
# Warehouse Database
# ============================================================================
[warehouse]
max_connections = 4
connection_timeout_seconds = 30
statement_timeout_seconds = 60
ssl_mode = "prefer"

[warehouse.credentials]
provider = "env"
env_prefix = "WAREHOUSE_DB_"

# ============================================================================
# Staged Object Storage
# ============================================================================
[storage]
# Backend: local | memory
backend = "local"

# Root directory for the local backend
root = "./quarry-data"

# Key prefixes for raw and transformed batches
raw_prefix = "ingestion"
processed_prefix = "processed"

# Persisted watermark map
state_key = "state/last_updated.json"

# ============================================================================
# Stages
# ============================================================================
[extract]
# Tables to extract (empty = all)
tables = []

[transform]
# Resolve address/department joins against every staged batch, not only
# the ones extracted in the current cycle
lookup_history = true

[load]
# Run the bundled warehouse DDL before loading
apply_schema = false

# ============================================================================
# Notifications
# ============================================================================
[notifications]
enabled = false

# Webhook receiving {"subject": ..., "message": ...}; log-only when unset
# webhook_url = "https://hooks.example.com/quarry"
timeout_seconds = 10

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = true

# Local log directory
local_path = "./logs"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}
