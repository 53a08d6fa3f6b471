//! Extract command implementation
//!
//! Runs one extraction cycle against the source database and prints the
//! extraction response.

use crate::adapters::database::create_source;
use crate::cli::commands::common::{
    exit_code_for, load_context, print_response, read_payload, report_failure,
};
use crate::core::extract::{ExtractRequest, Extractor};
use clap::Args;

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// JSON payload file (`-` for stdin)
    #[arg(long)]
    pub payload: Option<String>,

    /// Override the tables to extract (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    /// Query the source but stage nothing and keep watermarks
    #[arg(long)]
    pub dry_run: bool,
}

impl ExtractArgs {
    /// Execute the extract command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting extract command");

        let ctx = match load_context(config_path, self.dry_run) {
            Ok(ctx) => ctx,
            Err(code) => return Ok(code),
        };

        let mut request: ExtractRequest = read_payload(self.payload.as_deref())?;
        if let Some(tables) = &self.tables {
            tracing::info!(tables = ?tables, "Overriding tables from CLI");
            request.tables = Some(tables.clone());
        }

        let source = match create_source(ctx.config()).await {
            Ok(source) => source,
            Err(e) => return Ok(report_failure("Source connection", &e)),
        };

        match Extractor::new(&ctx, source).run(&request).await {
            Ok(response) => {
                print_response(&response)?;
                Ok(exit_code_for(
                    response.status,
                    !response.failed_tables.is_empty(),
                ))
            }
            Err(e) => Ok(report_failure("Extraction", &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_tables_are_comma_separated() {
        let cli = Cli::parse_from(["quarry", "extract", "--tables", "staff,currency"]);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(
            args.tables,
            Some(vec!["staff".to_string(), "currency".to_string()])
        );
        assert!(!args.dry_run);
    }
}
