//! Object storage abstraction

use crate::domain::Result;
use async_trait::async_trait;

/// Key/value object storage with prefix listing
///
/// Keys are `/`-separated paths. Objects are written whole and never mutated in
/// place by the pipeline, except the watermark state object which is overwritten.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes an object, replacing any previous content
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Reads an object
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::NotFound`](crate::domain::QuarryError::NotFound) when
    /// the key does not exist.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Lists keys starting with `prefix`, sorted lexicographically
    ///
    /// Returns an empty list when nothing matches.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Short description for logs (backend and root)
    fn describe(&self) -> String;
}
