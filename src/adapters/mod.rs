//! External system integrations for Quarry.
//!
//! This module provides adapters for integrating with external systems:
//!
//! - [`database`] - Source and warehouse abstraction layer (trait-based)
//! - [`postgresql`] - PostgreSQL implementation of the source and warehouse
//! - [`storage`] - Object storage for staged batches and watermark state
//! - [`secrets`] - Database credential providers
//! - [`notify`] - Stage outcome notifications
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. Stages only ever see the traits.
//!
//! ```rust
//! use quarry::adapters::storage::{MemoryObjectStore, ObjectStore};
//!
//! # async fn example() -> quarry::domain::Result<()> {
//! let store = MemoryObjectStore::new();
//! store.put("state/last_updated.json", b"{}".to_vec()).await?;
//! assert_eq!(store.list("state/").await?, vec!["state/last_updated.json"]);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod notify;
pub mod postgresql;
pub mod secrets;
pub mod storage;
