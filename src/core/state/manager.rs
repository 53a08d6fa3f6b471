//! State manager for watermark persistence
//!
//! The watermark map is stored as a single JSON object in the object store. It is
//! read once at the start of an extraction cycle and written once at the end.

use crate::adapters::storage::ObjectStore;
use crate::core::state::watermark::WatermarkState;
use crate::domain::{QuarryError, Result};
use std::sync::Arc;

/// Loads and saves the watermark map
pub struct StateManager {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl StateManager {
    /// Create a state manager persisting to `key`
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Storage key of the watermark map
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the watermark map
    ///
    /// A missing object means no table has been extracted yet and yields an
    /// empty map.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::State`] when the object exists but cannot be read
    /// or is not a JSON object of strings.
    pub async fn load(&self) -> Result<WatermarkState> {
        let bytes = match self.store.get(&self.key).await {
            Ok(bytes) => bytes,
            Err(QuarryError::NotFound(_)) => {
                tracing::info!(key = %self.key, "No previous state found; full extraction");
                return Ok(WatermarkState::default());
            }
            Err(e) => {
                return Err(QuarryError::State(format!(
                    "Failed to read {}: {e}",
                    self.key
                )))
            }
        };

        let state: WatermarkState = serde_json::from_slice(&bytes).map_err(|e| {
            QuarryError::State(format!("Watermark state at {} is malformed: {e}", self.key))
        })?;
        tracing::debug!(key = %self.key, tables = state.len(), "Loaded watermark state");
        Ok(state)
    }

    /// Save the watermark map as a single object write
    pub async fn save(&self, state: &WatermarkState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        self.store.put(&self.key, bytes).await.map_err(|e| {
            QuarryError::State(format!("Failed to save watermark state to {}: {e}", self.key))
        })?;
        tracing::info!(key = %self.key, tables = state.len(), "Watermark state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryObjectStore;
    use crate::core::state::watermark::parse_timestamp;

    #[tokio::test]
    async fn test_missing_state_is_empty() {
        let manager = StateManager::new(Arc::new(MemoryObjectStore::new()), "state/last_updated.json");
        assert!(manager.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = Arc::new(MemoryObjectStore::new());
        let manager = StateManager::new(store.clone(), "state/last_updated.json");

        let mut state = WatermarkState::new();
        state.advance("staff", parse_timestamp("2024-03-01 10:00:00").unwrap());
        manager.save(&state).await.unwrap();

        assert_eq!(store.keys(), vec!["state/last_updated.json"]);
        assert_eq!(manager.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_malformed_state_is_fatal() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put("state/last_updated.json", b"[1,2,3]".to_vec())
            .await
            .unwrap();
        let manager = StateManager::new(store, "state/last_updated.json");

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, QuarryError::State(_)));
        assert!(err.is_fatal());
    }
}
