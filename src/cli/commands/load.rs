//! Load command implementation
//!
//! Loads transformed batches named in the payload into the warehouse and prints
//! the load response.

use crate::adapters::database::create_warehouse;
use crate::cli::commands::common::{
    exit_code_for, load_context, print_response, read_payload, report_failure,
};
use crate::core::load::{LoadRequest, Loader};
use clap::Args;

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// JSON payload file (`-` for stdin), usually a transform response
    #[arg(long)]
    pub payload: Option<String>,

    /// Read and validate batches without inserting
    #[arg(long)]
    pub dry_run: bool,
}

impl LoadArgs {
    /// Execute the load command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting load command");

        let ctx = match load_context(config_path, self.dry_run) {
            Ok(ctx) => ctx,
            Err(code) => return Ok(code),
        };
        let request: LoadRequest = read_payload(self.payload.as_deref())?;

        let warehouse = match create_warehouse(ctx.config()).await {
            Ok(warehouse) => warehouse,
            Err(e) => return Ok(report_failure("Warehouse connection", &e)),
        };
        let mut connection = match warehouse.connect().await {
            Ok(connection) => connection,
            Err(e) => return Ok(report_failure("Warehouse connection", &e)),
        };

        match Loader::new(&ctx).run(&mut connection, &request).await {
            Ok(response) => {
                print_response(&response)?;
                Ok(exit_code_for(
                    response.status,
                    !response.failed_batches.is_empty(),
                ))
            }
            Err(e) => Ok(report_failure("Load", &e)),
        }
    }
}
