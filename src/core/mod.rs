//! Core pipeline logic for Quarry.
//!
//! # Modules
//!
//! - [`extract`] - Incremental extraction driven by per-table watermarks
//! - [`transform`] - Mapping raw rows onto the star schema
//! - [`load`] - Transactional loading of transformed batches
//! - [`state`] - Watermark persistence
//! - [`staging`] - Reading and writing staged batches
//! - [`pipeline`] - Shared stage context and in-process chaining
//!
//! # Cycle
//!
//! 1. **Load state**: read the watermark map from the object store
//! 2. **Extract**: query rows changed since each table's watermark, stage raw batches
//! 3. **Save state**: advance and persist watermarks for tables that produced rows
//! 4. **Transform**: map raw batches onto dimensions and facts, stage the results
//! 5. **Load**: insert each transformed batch in its own transaction
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry::adapters::database::{create_source, create_warehouse};
//! use quarry::config::load_config;
//! use quarry::core::pipeline::{run_pipeline, PipelineContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//! let source = create_source(&config).await?;
//! let warehouse = create_warehouse(&config).await?;
//! let mut connection = warehouse.connect().await?;
//!
//! let ctx = PipelineContext::from_config(config)?;
//! let response = run_pipeline(&ctx, source, Some(&mut connection)).await?;
//! println!("Extracted {} rows", response.extract.rows);
//! # Ok(())
//! # }
//! ```

pub mod extract;
pub mod load;
pub mod pipeline;
pub mod staging;
pub mod state;
pub mod status;
pub mod transform;
