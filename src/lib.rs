// Quarry - Incremental OLTP to Star-Schema ETL
// Copyright (c) 2025 Quarry Contributors
// Licensed under the MIT License

//! # Quarry - Incremental OLTP to Star-Schema ETL
//!
//! Quarry moves changed rows from an operational PostgreSQL database into a
//! star-schema warehouse in three stages, with staged batches in object storage
//! between them.
//!
//! ## Overview
//!
//! - **Extracting** rows whose `last_updated` is newer than a per-table watermark
//! - **Transforming** raw rows into dimension and fact records
//! - **Loading** each transformed batch inside its own transaction
//! - **Tracking** watermarks so re-runs never extract the same rows twice
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages, staging and watermark state
//! - [`adapters`] - PostgreSQL, object storage, secrets and notifications
//! - [`domain`] - Table schemas, records, batches and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::adapters::database::create_source;
//! use quarry::config::load_config;
//! use quarry::core::extract::{ExtractRequest, Extractor};
//! use quarry::core::pipeline::PipelineContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("quarry.toml")?;
//!     let source = create_source(&config).await?;
//!     let ctx = PipelineContext::from_config(config)?;
//!
//!     let response = Extractor::new(&ctx, source)
//!         .run(&ExtractRequest::default())
//!         .await?;
//!
//!     println!("Extracted {} rows", response.rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::QuarryError`]; per-table failures are recorded in
//! each stage's response rather than returned, so one bad table never stops a cycle.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
