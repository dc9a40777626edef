//! MyContacts Core - Shared types library.
//!
//! This crate provides the domain types used across all MyContacts
//! components:
//! - `web` - The contacts web application
//!
//! # Architecture
//!
//! The core crate contains only types and codecs - no I/O, no HTTP clients.
//! Everything that is persisted to the remote store (credential table,
//! per-user contact tables) is represented here, together with the tabular
//! text format they are serialized in.
//!
//! # Modules
//!
//! - [`types`] - Validated domain types: usernames, contacts, credentials
//! - [`table`] - Header-row tabular text codec used for persisted tables

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod table;
pub mod types;

pub use types::*;
