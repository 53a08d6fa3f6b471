//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over the operational source and
//! the warehouse, so extraction and loading can run against PostgreSQL or against
//! in-memory implementations in tests.

pub mod factory;
pub mod traits;

pub use factory::{create_source, create_warehouse};
pub use traits::{RawRow, SourceDatabase, WarehouseConnection, WarehouseTransaction};
