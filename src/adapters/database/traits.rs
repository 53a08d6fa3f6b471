//! Database abstraction traits
//!
//! The pipeline talks to the operational source and to the warehouse only through
//! these traits, so stages can be driven by in-memory fakes in tests.

use crate::core::extract::ExtractQuery;
use crate::domain::{Result, WarehouseTable};
use async_trait::async_trait;
use serde_json::Value;

/// One raw source row: text cells aligned to [`ExtractQuery::columns`]
pub type RawRow = Vec<Option<String>>;

/// Read access to the operational source database
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Runs an extraction query and returns every row as text cells
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails; the caller treats it as a failure of
    /// that table only.
    async fn fetch(&self, query: &ExtractQuery) -> Result<Vec<RawRow>>;

    /// Test the database connection
    async fn test_connection(&self) -> Result<()>;
}

/// A single warehouse connection held for the duration of a load
#[async_trait]
pub trait WarehouseConnection: Send {
    /// Opens a transaction on this connection
    ///
    /// The transaction borrows the connection until it is committed or rolled
    /// back; dropping it without either rolls it back.
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn WarehouseTransaction + Send + 'a>>;

    /// Runs DDL statements outside any batch transaction
    async fn apply_schema(&mut self, ddl: &str) -> Result<()>;
}

/// An open warehouse transaction
#[async_trait]
pub trait WarehouseTransaction: Send {
    /// Inserts one row given as a JSON object keyed by column name
    async fn insert_row(&mut self, table: WarehouseTable, row: &Value) -> Result<()>;

    /// Commits every row inserted so far
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every row inserted so far
    async fn rollback(self: Box<Self>) -> Result<()>;
}
