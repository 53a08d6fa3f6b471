//! Helpers shared by the stage commands

use crate::config::load_config;
use crate::core::pipeline::PipelineContext;
use crate::core::status::StageStatus;
use crate::domain::QuarryError;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;

/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;

/// Reads a JSON invocation payload from a file, or stdin for `-`
///
/// No path yields the default (empty) payload.
pub fn read_payload<T: DeserializeOwned + Default>(path: Option<&str>) -> anyhow::Result<T> {
    let text = match path {
        None => return Ok(T::default()),
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file {path}"))?,
    };
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&text).context("Payload is not valid JSON for this stage")
}

/// Prints a stage response as pretty JSON on stdout
pub fn print_response<T: Serialize>(response: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

/// Exit code for a completed stage
pub fn exit_code_for(status: StageStatus, has_failures: bool) -> i32 {
    match status {
        StageStatus::Error => 1,
        _ if has_failures => 1,
        _ => 0,
    }
}

/// Exit code for a stage that returned an error
pub fn error_exit_code(error: &QuarryError) -> i32 {
    match error {
        QuarryError::Configuration(_) | QuarryError::Validation(_) => EXIT_CONFIG,
        QuarryError::Connection(_) => 4,
        _ => 5,
    }
}

/// Loads configuration and builds the stage context
///
/// On failure prints the error and returns the exit code to use.
pub fn load_context(config_path: &str, dry_run: bool) -> Result<PipelineContext, i32> {
    let config = load_config(config_path).map_err(|e| {
        eprintln!("❌ Failed to load configuration file");
        eprintln!("   Error: {e}");
        EXIT_CONFIG
    })?;

    if dry_run {
        tracing::info!("Enabling dry-run mode from CLI");
    }

    PipelineContext::from_config(config)
        .map(|ctx| ctx.with_dry_run(dry_run))
        .map_err(|e| {
            eprintln!("❌ Failed to initialize pipeline");
            eprintln!("   Error: {e}");
            error_exit_code(&e)
        })
}

/// Prints a stage failure and returns its exit code
pub fn report_failure(stage: &str, error: &QuarryError) -> i32 {
    if error.is_fatal() {
        tracing::error!(stage = stage, error = %error, "Stage aborted");
    }
    eprintln!("❌ {stage} failed");
    eprintln!("   Error: {error}");
    error_exit_code(error)
}
