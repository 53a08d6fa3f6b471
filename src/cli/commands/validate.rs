//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Quarry configuration file.

use crate::cli::commands::common::EXIT_CONFIG;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading validates every section
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let tables = match config.extract.resolved_tables() {
            Ok(tables) => tables,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!(
            "  Source Credentials: {:?}",
            config.source.credentials.provider
        );
        println!(
            "  Warehouse Credentials: {:?}",
            config.warehouse.credentials.provider
        );
        println!("  Storage Backend: {:?}", config.storage.backend);
        println!("  Storage Root: {}", config.storage.root);
        println!("  State Key: {}", config.storage.state_key);
        println!(
            "  Tables: {}",
            tables
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("  Lookup History: {}", config.transform.lookup_history);
        println!("  Apply Schema: {}", config.load.apply_schema);
        println!(
            "  Notifications: {}",
            if config.notifications.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();
        Ok(0)
    }
}
