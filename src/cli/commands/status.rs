//! Status command implementation
//!
//! This module implements the `status` command for displaying the persisted
//! watermarks.

use crate::adapters::storage::create_object_store;
use crate::cli::commands::common::EXIT_CONFIG;
use crate::config::load_config;
use crate::core::state::{StateManager, WatermarkState};
use crate::domain::SourceTable;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single table
    #[arg(long)]
    pub table: Option<String>,

    /// Print the raw watermark map as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking watermark status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let store = create_object_store(&config.storage);
        let manager = StateManager::new(Arc::clone(&store), config.storage.state_key.as_str());
        let state = match manager.load().await {
            Ok(state) => state,
            Err(e) => {
                println!("❌ Failed to load watermarks from {}", store.describe());
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(0);
        }

        println!("📊 Watermark Status ({})", manager.key());
        println!();

        if state.is_empty() {
            println!("No extraction history found.");
            println!("Run 'quarry extract' or 'quarry run' to start.");
            return Ok(0);
        }

        let rows = self.rows(&state);
        if rows.is_empty() {
            println!("No watermarks match the specified table.");
            return Ok(0);
        }

        println!("{:<20} {:<35}", "Table", "Last Updated");
        println!("{}", "-".repeat(55));
        for (table, watermark) in rows {
            println!("{table:<20} {watermark:<35}");
        }
        println!();
        Ok(0)
    }

    /// Allow-listed tables (optionally one) with their watermark or `Never`
    fn rows(&self, state: &WatermarkState) -> Vec<(String, String)> {
        SourceTable::ALL
            .iter()
            .map(|t| t.as_str())
            .filter(|name| self.table.as_deref().map_or(true, |wanted| wanted == *name))
            .map(|name| {
                let watermark = state.get(name).unwrap_or("Never").to_string();
                (name.to_string(), watermark)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_cover_every_table_with_never_default() {
        let args = StatusArgs {
            table: None,
            json: false,
        };
        let mut state = WatermarkState::new();
        state.set_raw("staff", "2024-02-01T00:00:00Z");

        let rows = args.rows(&state);
        assert_eq!(rows.len(), SourceTable::ALL.len());
        assert!(rows.contains(&("staff".to_string(), "2024-02-01T00:00:00Z".to_string())));
        assert!(rows.contains(&("design".to_string(), "Never".to_string())));
    }

    #[test]
    fn test_rows_filtered_by_table() {
        let args = StatusArgs {
            table: Some("currency".to_string()),
            json: false,
        };
        let rows = args.rows(&WatermarkState::new());
        assert_eq!(rows, vec![("currency".to_string(), "Never".to_string())]);
    }
}
