//! Authentication service.
//!
//! Validates submitted credentials against the credential table, handles
//! registration, and owns the session-lifetime credential cache.
//!
//! The credential table lives at a fixed path in the remote store and is
//! loaded lazily on first access. Every mutation is read-modify-write over
//! the freshest cached table, and the cache advances only after the remote
//! write succeeds, so a failed write never makes the session believe a
//! registration happened.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tokio::sync::RwLock;

use mycontacts_core::{CredentialRecord, CredentialTable, DuplicateUsername, Username};
use mycontacts_core::table::Table;

use crate::store::{RemoteStore, StoreError};

/// Fixed path of the credential table in the remote store.
pub const CREDENTIALS_FILE: &str = "login_data.csv";

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication status of a session.
///
/// `Failed` is not sticky: a fresh [`AuthService::submit`] re-evaluates
/// from scratch. Unknown usernames and wrong passwords both produce
/// `Failed` with no further detail, so login cannot be used to enumerate
/// users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// No credentials submitted yet.
    Unauthenticated,
    /// Credentials verified; the session belongs to this user.
    Authenticated(Username),
    /// The last submission did not verify.
    Failed,
}

/// Profile metadata captured at registration.
#[derive(Debug, Clone)]
pub struct NewUserProfile {
    /// Human-readable display name.
    pub display_name: String,
    /// Contact email address.
    pub email: String,
}

/// Authentication service.
///
/// Cheap to share: handlers clone the `Arc`-held store; the credential
/// cache lives inside the service for the lifetime of the process.
pub struct AuthService<S> {
    store: Arc<S>,
    credentials: RwLock<Option<CredentialTable>>,
}

impl<S: RemoteStore> AuthService<S> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            credentials: RwLock::new(None),
        }
    }

    /// The current credential table.
    ///
    /// Returns the cached table if already loaded this session; otherwise
    /// reads it from the remote store, falling back to an empty table when
    /// the file does not exist yet (first run).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` on transport failure or
    /// `AuthError::Malformed` if the stored table does not decode.
    pub async fn credentials(&self) -> Result<CredentialTable, AuthError> {
        if let Some(table) = self.credentials.read().await.as_ref() {
            return Ok(table.clone());
        }

        let table = self.load_table().await?;
        let mut cache = self.credentials.write().await;
        // Another task may have loaded concurrently; keep whichever landed.
        Ok(cache.get_or_insert(table).clone())
    }

    /// Drop the cached table so the next access reloads from the store.
    pub async fn refresh(&self) {
        *self.credentials.write().await = None;
    }

    /// Validate a submitted username/password pair.
    ///
    /// Unknown usernames, malformed usernames and wrong passwords all yield
    /// [`AuthStatus::Failed`] with identical outward signaling.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` only for credential table access failures, never
    /// for bad credentials.
    pub async fn submit(&self, username: &str, password: &str) -> Result<AuthStatus, AuthError> {
        let Ok(username) = Username::parse(username) else {
            return Ok(AuthStatus::Failed);
        };

        let table = self.credentials().await?;
        let Some(record) = table.get(&username) else {
            return Ok(AuthStatus::Failed);
        };

        if verify_password(password, &record.password_hash) {
            Ok(AuthStatus::Authenticated(username))
        } else {
            Ok(AuthStatus::Failed)
        }
    }

    /// Register a new user and persist the updated credential table.
    ///
    /// Registration does not authenticate the user; callers still go
    /// through [`Self::submit`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` for a malformed username,
    /// `AuthError::WeakPassword` if the password is too short,
    /// `AuthError::DuplicateUser` if the username is taken (the table is
    /// left unchanged), or a store error if persisting fails (the cache is
    /// left unchanged).
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        profile: NewUserProfile,
    ) -> Result<Username, AuthError> {
        let username = Username::parse(username)?;
        validate_password(password)?;

        // The whole check-insert-persist sequence runs under the cache
        // write lock, so concurrent registrations serialize and each one
        // bases its write on the previous winner's table.
        let mut cache = self.credentials.write().await;
        let mut table = match cache.as_ref() {
            Some(table) => table.clone(),
            None => self.load_table().await?,
        };
        if table.contains(&username) {
            return Err(AuthError::DuplicateUser);
        }

        let record = CredentialRecord {
            username: username.clone(),
            password_hash: hash_password(password)?,
            display_name: profile.display_name,
            email: profile.email,
            roles: vec!["user".to_string()],
            registered_at: Utc::now(),
        };
        table
            .insert(record)
            .map_err(|DuplicateUsername(_)| AuthError::DuplicateUser)?;

        let change_note = format!("Add user '{username}' to {CREDENTIALS_FILE}");
        self.store
            .write(CREDENTIALS_FILE, &table.to_table().encode(), &change_note)
            .await?;

        // Advance the cache only after the durable write succeeded.
        *cache = Some(table);

        tracing::info!(user = %username, "user registered");
        Ok(username)
    }

    async fn load_table(&self) -> Result<CredentialTable, AuthError> {
        let text = match self.store.read(CREDENTIALS_FILE).await {
            Ok(text) => text,
            Err(StoreError::NotFound(_)) => return Ok(CredentialTable::new()),
            Err(other) => return Err(other.into()),
        };
        let table = Table::parse(&text).map_err(|e| AuthError::Malformed(e.to_string()))?;
        CredentialTable::from_table(&table).map_err(|e| AuthError::Malformed(e.to_string()))
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// An unparseable hash verifies as false rather than erroring; to a caller
/// it is just a failed login.
fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
