//! Remote store access.
//!
//! The system of record is a versioned remote file store (the GitHub
//! Contents API in production, an in-memory map in tests and local
//! development). Files are read and written whole; every write carries a
//! human-readable change note that becomes the audit trail entry.
//!
//! Cross-session writers to the same path are not coordinated: the store
//! offers no locking, and last writer wins. Within a session, callers keep
//! read-modify-write consistent by basing every write on the freshest
//! in-session cache and advancing the cache only after a successful write.

pub mod github;
pub mod memory;
mod user_scoped;

pub use github::GithubStore;
pub use memory::MemoryStore;
pub use user_scoped::{DATA_FOLDER_PREFIX, StorageError, UserStorage};

use std::future::Future;

use thiserror::Error;

/// Errors surfaced by a [`RemoteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No file exists at the path.
    #[error("no file at '{0}'")]
    NotFound(String),

    /// The store rejected a write (conflict, permissions, validation).
    #[error("write to '{path}' rejected: {reason}")]
    WriteRejected {
        /// Path of the rejected write.
        path: String,
        /// Store-provided reason.
        reason: String,
    },

    /// Transport-level failure (connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store returned a response we could not interpret.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// A remote file store addressed by path.
///
/// Single logical file per resource; no partial updates. `write` creates or
/// overwrites the whole file.
pub trait RemoteStore: Send + Sync {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Read the full text content at `path`.
    ///
    /// Fails with [`StoreError::NotFound`] if the file is absent.
    fn read(&self, path: &str) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Create or overwrite the file at `path`.
    ///
    /// `change_note` is recorded as the human-readable audit entry for the
    /// write (a commit message in the GitHub implementation).
    fn write(
        &self,
        path: &str,
        content: &str,
        change_note: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
