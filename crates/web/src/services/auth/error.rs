//! Authentication error types.

use thiserror::Error;

use mycontacts_core::UsernameError;

use crate::store::StoreError;

/// Errors that can occur during authentication operations.
///
/// Note what is deliberately absent: there is no "wrong password" and no
/// "unknown user" variant. Failed logins are a state
/// ([`AuthStatus::Failed`](super::AuthStatus)), not an error, and the two
/// causes are indistinguishable to callers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username format (registration only).
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Username already registered.
    #[error("user already exists")]
    DuplicateUser,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// The credential table could not be read or written.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    /// The stored credential table is malformed.
    #[error("malformed credential table: {0}")]
    Malformed(String),
}
