//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Quarry using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Quarry - incremental OLTP to star-schema ETL
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(version, about, long_about = None)]
#[command(author = "Quarry Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "quarry.toml", env = "QUARRY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "QUARRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract rows changed since the last watermark into raw batches
    Extract(commands::extract::ExtractArgs),

    /// Transform raw batches into star-schema batches
    Transform(commands::transform::TransformArgs),

    /// Load transformed batches into the warehouse
    Load(commands::load::LoadArgs),

    /// Run extract, transform and load in sequence
    Run(commands::run::RunArgs),

    /// Show persisted watermarks
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["quarry", "run"]);
        assert_eq!(cli.config, "quarry.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["quarry", "--config", "custom.toml", "extract"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Extract(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["quarry", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_stage_payloads() {
        let cli = Cli::parse_from(["quarry", "transform", "--payload", "-", "--dry-run"]);
        let Commands::Transform(args) = cli.command else {
            panic!("expected transform");
        };
        assert_eq!(args.payload.as_deref(), Some("-"));
        assert!(args.dry_run);

        let cli = Cli::parse_from(["quarry", "load", "--payload", "out.json"]);
        assert!(matches!(cli.command, Commands::Load(_)));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["quarry", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["quarry", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
