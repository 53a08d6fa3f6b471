//! PostgreSQL database integration
//!
//! This module provides the PostgreSQL implementations of the source reader and
//! the warehouse writer, sharing one pooled client type.

pub mod client;
pub mod source;
pub mod warehouse;

pub use client::{PostgreSQLClient, WAREHOUSE_SCHEMA_SQL};
pub use source::PostgreSQLSource;
pub use warehouse::{insert_statement, PgTransaction, PgWarehouseConnection, PostgreSQLWarehouse};
