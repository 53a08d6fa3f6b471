//! Transform command implementation
//!
//! Maps raw batches named in the payload onto the star schema and prints the
//! transform response.

use crate::cli::commands::common::{
    exit_code_for, load_context, print_response, read_payload, report_failure,
};
use crate::core::transform::{TransformRequest, Transformer};
use clap::Args;

/// Arguments for the transform command
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// JSON payload file (`-` for stdin), usually an extract response
    #[arg(long)]
    pub payload: Option<String>,

    /// Transform but stage nothing
    #[arg(long)]
    pub dry_run: bool,
}

impl TransformArgs {
    /// Execute the transform command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting transform command");

        let ctx = match load_context(config_path, self.dry_run) {
            Ok(ctx) => ctx,
            Err(code) => return Ok(code),
        };
        let request: TransformRequest = read_payload(self.payload.as_deref())?;

        match Transformer::new(&ctx).run(&request).await {
            Ok(response) => {
                print_response(&response)?;
                Ok(exit_code_for(
                    response.status,
                    !response.failed_tables.is_empty(),
                ))
            }
            Err(e) => Ok(report_failure("Transform", &e)),
        }
    }
}
