//! Run command implementation
//!
//! Chains extract, transform and load in one process.

use crate::adapters::database::{create_source, create_warehouse, WarehouseConnection};
use crate::cli::commands::common::{load_context, print_response, report_failure};
use crate::core::pipeline::run_pipeline;
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Extract and transform without writing anything; load is skipped
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting pipeline run");

        let ctx = match load_context(config_path, self.dry_run) {
            Ok(ctx) => ctx,
            Err(code) => return Ok(code),
        };

        let source = match create_source(ctx.config()).await {
            Ok(source) => source,
            Err(e) => return Ok(report_failure("Source connection", &e)),
        };
        let mut connection = None;
        if !ctx.dry_run() {
            let warehouse = match create_warehouse(ctx.config()).await {
                Ok(warehouse) => warehouse,
                Err(e) => return Ok(report_failure("Warehouse connection", &e)),
            };
            match warehouse.connect().await {
                Ok(conn) => connection = Some(conn),
                Err(e) => return Ok(report_failure("Warehouse connection", &e)),
            }
        }
        let warehouse = connection
            .as_mut()
            .map(|conn| conn as &mut dyn WarehouseConnection);

        match run_pipeline(&ctx, source, warehouse).await {
            Ok(response) => {
                print_response(&response)?;
                Ok(if response.has_failures() { 1 } else { 0 })
            }
            Err(e) => Ok(report_failure("Pipeline", &e)),
        }
    }
}
