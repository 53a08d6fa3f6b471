//! In-memory object store

use super::traits::ObjectStore;
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// In-memory object store for tests and throwaway runs
///
/// Thread-safe via `RwLock`. Clones share the same objects.
#[derive(Debug, Default, Clone)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored key, sorted
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned() -> QuarryError {
    QuarryError::Storage("memory store lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| QuarryError::NotFound(format!("object not found: {key}")))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryObjectStore::new();
        store.put("a/b.json", b"{}".to_vec()).await.unwrap();

        assert_eq!(store.get("a/b.json").await.unwrap(), b"{}");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryObjectStore::new();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, QuarryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let store = MemoryObjectStore::new();
        for key in ["ingestion/staff/2", "ingestion/address/1", "ingestion/staff/1", "state/x"] {
            store.put(key, Vec::new()).await.unwrap();
        }

        assert_eq!(
            store.list("ingestion/staff/").await.unwrap(),
            vec!["ingestion/staff/1", "ingestion/staff/2"]
        );
        assert!(store.list("processed/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_objects() {
        let store = MemoryObjectStore::new();
        let other = store.clone();
        store.put("k", vec![1]).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), vec![1]);
    }
}
