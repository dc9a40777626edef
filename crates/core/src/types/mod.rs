//! Core types for MyContacts.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod credential;
pub mod username;

pub use contact::{ContactRecord, ContactTable, ContactTableError, Coordinates};
pub use credential::{CredentialRecord, CredentialTable, CredentialTableError, DuplicateUsername};
pub use username::{Username, UsernameError};
