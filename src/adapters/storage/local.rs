//! Filesystem-backed object store
//!
//! Keys map to paths under a bucket root directory. Writes go to a temporary
//! sibling file first and are renamed into place, so readers never observe a
//! half-written object.

use super::traits::ObjectStore;
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Creates a store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bucket root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(QuarryError::Storage(format!("Invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                QuarryError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| QuarryError::Storage(format!("Failed to write {key}: {e}")))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| QuarryError::Storage(format!("Failed to commit {key}: {e}")))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(QuarryError::NotFound(format!("object not found: {key}")))
            }
            Err(e) => Err(QuarryError::Storage(format!("Failed to read {key}: {e}"))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // Walk from the deepest directory fully named by the prefix.
        let dir_part = match prefix.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.path_for(dir_part)?
        };

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(QuarryError::Storage(format!(
                        "Failed to list {}: {e}",
                        dir.display()
                    )))
                }
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    let is_temp = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.starts_with("tmp-"));
                    if key.starts_with(prefix) && !is_temp {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
