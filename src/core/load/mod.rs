//! Warehouse loading with per-batch transactions

pub mod loader;
pub mod outcome;

pub use loader::{load_batch, resolve_table, row_object, LoadRequest, LoadResponse, Loader};
pub use outcome::{BatchOutcome, FailedBatch, TableLoad};
