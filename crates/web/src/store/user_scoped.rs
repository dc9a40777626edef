//! Per-user scoped storage.
//!
//! Maps logical resource paths to physical paths namespaced by the
//! authenticated username, and exposes typed read/write helpers that
//! delegate to the remote store. Without a bound user every path resolution
//! fails, which is what prevents one user's request from touching another
//! user's files.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use mycontacts_core::Username;
use mycontacts_core::table::Table;

use crate::store::{RemoteStore, StoreError};

/// Fixed prefix of every per-user folder in the remote store.
pub const DATA_FOLDER_PREFIX: &str = "user_data_";

/// Domain errors for user-scoped storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage access attempted without an authenticated user.
    ///
    /// This is a programming error in the caller, not a user-facing
    /// condition.
    #[error("storage access without an authenticated user")]
    NotAuthenticated,

    /// The resource does not exist.
    #[error("no file at '{0}'")]
    NotFound(String),

    /// The remote store rejected or failed a write.
    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    /// The remote store failed a read.
    #[error("remote read failed: {0}")]
    RemoteRead(String),

    /// Stored content could not be decoded.
    #[error("malformed content at '{path}': {reason}")]
    Malformed {
        /// Physical path of the malformed resource.
        path: String,
        /// Decode failure description.
        reason: String,
    },
}

impl StorageError {
    fn from_read(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => Self::NotFound(path),
            other => Self::RemoteRead(other.to_string()),
        }
    }

    fn from_write(err: StoreError) -> Self {
        Self::RemoteWrite(err.to_string())
    }
}

/// Storage scoped to the authenticated user of a session.
///
/// Constructed per request; the store handle is shared.
pub struct UserStorage<S> {
    store: Arc<S>,
    user: Option<Username>,
}

impl<S: RemoteStore> UserStorage<S> {
    /// Create storage for an optional user (no user means every access
    /// fails with [`StorageError::NotAuthenticated`]).
    #[must_use]
    pub const fn new(store: Arc<S>, user: Option<Username>) -> Self {
        Self { store, user }
    }

    /// Create storage bound to an authenticated user.
    #[must_use]
    pub const fn for_user(store: Arc<S>, user: Username) -> Self {
        Self {
            store,
            user: Some(user),
        }
    }

    /// Resolve a logical path to the user's physical path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotAuthenticated` if no user is bound.
    pub fn full_path(&self, logical: &str) -> Result<String, StorageError> {
        let user = self.user.as_ref().ok_or(StorageError::NotAuthenticated)?;
        Ok(format!("{DATA_FOLDER_PREFIX}{user}/{logical}"))
    }

    /// Whether the resource exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on path resolution or store failure.
    pub async fn exists(&self, logical: &str) -> Result<bool, StorageError> {
        let path = self.full_path(logical)?;
        self.store
            .exists(&path)
            .await
            .map_err(StorageError::from_read)
    }

    /// Read a text resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if absent, or another `StorageError`
    /// on failure.
    pub async fn read_text(&self, logical: &str) -> Result<String, StorageError> {
        let path = self.full_path(logical)?;
        self.store.read(&path).await.map_err(StorageError::from_read)
    }

    /// Write a text resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on path resolution or write failure.
    pub async fn write_text(
        &self,
        logical: &str,
        text: &str,
        change_note: &str,
    ) -> Result<(), StorageError> {
        let path = self.full_path(logical)?;
        self.store
            .write(&path, text, change_note)
            .await
            .map_err(StorageError::from_write)
    }

    /// Read a structured (JSON) resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Malformed` if the content does not decode.
    pub async fn read_json<T: DeserializeOwned>(&self, logical: &str) -> Result<T, StorageError> {
        let path = self.full_path(logical)?;
        let text = self.store.read(&path).await.map_err(StorageError::from_read)?;
        serde_json::from_str(&text).map_err(|e| StorageError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    /// Write a structured (JSON) resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on encoding or write failure.
    pub async fn write_json<T: Serialize>(
        &self,
        logical: &str,
        value: &T,
        change_note: &str,
    ) -> Result<(), StorageError> {
        let path = self.full_path(logical)?;
        let text = serde_json::to_string_pretty(value).map_err(|e| StorageError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.store
            .write(&path, &text, change_note)
            .await
            .map_err(StorageError::from_write)
    }

    /// Read a tabular resource (header row + data rows).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Malformed` if the content does not parse as a
    /// table.
    pub async fn read_table(&self, logical: &str) -> Result<Table, StorageError> {
        let path = self.full_path(logical)?;
        let text = self.store.read(&path).await.map_err(StorageError::from_read)?;
        Table::parse(&text).map_err(|e| StorageError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    /// Write a tabular resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on path resolution or write failure.
    pub async fn write_table(
        &self,
        logical: &str,
        table: &Table,
        change_note: &str,
    ) -> Result<(), StorageError> {
        let path = self.full_path(logical)?;
        self.store
            .write(&path, &table.encode(), change_note)
            .await
            .map_err(StorageError::from_write)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn alice() -> Username {
        Username::parse("alice").unwrap()
    }

    #[test]
    fn test_full_path_is_namespaced_by_user() {
        let storage = UserStorage::for_user(Arc::new(MemoryStore::new()), alice());
        assert_eq!(storage.full_path("contacts").unwrap(), "user_data_alice/contacts");
    }

    #[test]
    fn test_full_path_without_user_fails() {
        let storage = UserStorage::new(Arc::new(MemoryStore::new()), None);
        assert!(matches!(
            storage.full_path("contacts"),
            Err(StorageError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_read_missing_resource_is_not_found() {
        let storage = UserStorage::for_user(Arc::new(MemoryStore::new()), alice());
        assert!(matches!(
            storage.read_text("contacts").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_text_round_trip_with_change_note() {
        let store = Arc::new(MemoryStore::new());
        let storage = UserStorage::for_user(Arc::clone(&store), alice());

        storage.write_text("notes.txt", "hi", "Add notes").await.unwrap();
        assert_eq!(storage.read_text("notes.txt").await.unwrap(), "hi");

        let log = store.change_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log.first().unwrap().path, "user_data_alice/notes.txt");
        assert_eq!(log.first().unwrap().change_note, "Add notes");
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Prefs {
            theme: String,
        }

        let storage = UserStorage::for_user(Arc::new(MemoryStore::new()), alice());
        let prefs = Prefs {
            theme: "dark".to_string(),
        };
        storage.write_json("prefs.json", &prefs, "Update prefs").await.unwrap();

        let read: Prefs = storage.read_json("prefs.json").await.unwrap();
        assert_eq!(read, prefs);
    }

    #[tokio::test]
    async fn test_malformed_table_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.seed("user_data_alice/contacts", "a,b\n\"broken\n").await;

        let storage = UserStorage::for_user(store, alice());
        assert!(matches!(
            storage.read_table("contacts").await,
            Err(StorageError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_users_do_not_share_paths() {
        let store = Arc::new(MemoryStore::new());
        let alice_storage = UserStorage::for_user(Arc::clone(&store), alice());
        alice_storage.write_text("contacts", "alice data", "seed").await.unwrap();

        let bob = UserStorage::for_user(store, Username::parse("bob").unwrap());
        assert!(!bob.exists("contacts").await.unwrap());
    }
}
