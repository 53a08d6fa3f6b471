//! Staged object storage
//!
//! Batches and the watermark state live in an [`ObjectStore`]. Two backends ship
//! with the crate: a directory tree on local disk and an in-memory map.

pub mod local;
pub mod memory;
pub mod traits;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use traits::ObjectStore;

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Create the object store selected by configuration
pub fn create_object_store(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend {
        StorageBackend::Local => {
            tracing::debug!(root = %config.root, "Using local object store");
            Arc::new(LocalObjectStore::new(&config.root))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store; staged data is lost on exit");
            Arc::new(MemoryObjectStore::new())
        }
    }
}
