//! In-memory store implementation.
//!
//! The local fallback and the test double: a plain map from path to content
//! plus a log of every write's change note, so tests can assert on the
//! audit trail.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::store::{RemoteStore, StoreError};

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogEntry {
    /// Path that was written.
    pub path: String,
    /// The change note supplied by the writer.
    pub change_note: String,
}

/// Remote store backed by an in-memory map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<String, String>>,
    change_log: RwLock<Vec<ChangeLogEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a change log entry.
    pub async fn seed(&self, path: &str, content: &str) {
        self.files
            .write()
            .await
            .insert(path.to_string(), content.to_string());
    }

    /// Snapshot of all writes performed so far, in order.
    pub async fn change_log(&self) -> Vec<ChangeLogEntry> {
        self.change_log.read().await.clone()
    }
}

impl RemoteStore for MemoryStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.files.read().await.contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, content: &str, change_note: &str) -> Result<(), StoreError> {
        self.files
            .write()
            .await
            .insert(path.to_string(), content.to_string());
        self.change_log.write().await.push(ChangeLogEntry {
            path: path.to_string(),
            change_note: change_note.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read("nope").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();
        store.write("a/b", "hello", "Add b").await.unwrap();

        assert!(store.exists("a/b").await.unwrap());
        assert_eq!(store.read("a/b").await.unwrap(), "hello");

        let log = store.change_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].change_note, "Add b");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let store = MemoryStore::new();
        store.write("f", "v1", "first").await.unwrap();
        store.write("f", "v2", "second").await.unwrap();

        assert_eq!(store.read("f").await.unwrap(), "v2");
        assert_eq!(store.change_log().await.len(), 2);
    }
}
