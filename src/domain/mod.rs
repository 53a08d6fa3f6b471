//! Domain models and types for Quarry.
//!
//! This module holds the pipeline's vocabulary: the source allow-list, the
//! warehouse star schema, schema-bound records, the staged batch format and the
//! error types every layer returns.
//!
//! # Overview
//!
//! - **Source tables** ([`SourceTable`]): the fixed set of extractable tables
//! - **Warehouse tables** ([`WarehouseTable`]): dimensions and facts with their column order
//! - **Records** ([`Record`], [`RecordBuilder`], [`SourceRow`])
//! - **Staged batches** ([`StagedBatch`], [`BatchMetadata`])
//! - **Error types** ([`QuarryError`]) and the [`Result`] alias
//!
//! # Allow-listing
//!
//! Table names from configuration or payloads are parsed, never interpolated:
//!
//! ```rust
//! use quarry::domain::SourceTable;
//!
//! let table: SourceTable = "sales_order".parse().unwrap();
//! assert_eq!(table.schema().primary_key, "sales_order_id");
//! assert!("sales_order; --".parse::<SourceTable>().is_err());
//! ```

pub mod batch;
pub mod context;
pub mod errors;
pub mod record;
pub mod result;
pub mod tables;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use batch::{BatchMetadata, BatchStage, StagedBatch};
pub use errors::QuarryError;
pub use record::{Record, RecordBuilder, SourceRow};
pub use result::Result;
pub use tables::{SourceTable, TableSchema, CHANGE_TIMESTAMP_COLUMN};
pub use warehouse::{TableKind, WarehouseSchema, WarehouseTable};
