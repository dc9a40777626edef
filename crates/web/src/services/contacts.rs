//! Contact management.
//!
//! Loads and persists the authenticated user's contact table, enriches new
//! contacts with geocoded coordinates, and keeps a per-user in-memory copy
//! so a session only reads the remote file once.
//!
//! Geocoding is best-effort: when the lookup fails the contact is persisted
//! without coordinates and the caller receives a warning to surface, never
//! an error.

use moka::future::Cache;
use thiserror::Error;

use mycontacts_core::{ContactRecord, ContactTable, Username};

use crate::services::geocode::Geocoder;
use crate::store::{RemoteStore, StorageError, UserStorage};

/// Logical name of the per-user contacts file.
pub const CONTACTS_FILE: &str = "contacts";

/// Form-level validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left empty.
    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Errors that can occur during contact operations.
#[derive(Debug, Error)]
pub enum ContactError {
    /// The submitted fields did not validate.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The contact table could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Raw fields of a submitted contact, before validation and enrichment.
#[derive(Debug, Clone)]
pub struct ContactFields {
    /// Contact name.
    pub name: String,
    /// Street and house number.
    pub street: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
}

impl ContactFields {
    /// Validate that every field is filled in.
    ///
    /// Reports the first empty field in display order, matching the form
    /// layout top to bottom.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("name", &self.name),
            ("street", &self.street),
            ("postal_code", &self.postal_code),
            ("city", &self.city),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(label));
            }
        }
        Ok(())
    }
}

/// The result of adding a contact.
#[derive(Debug)]
pub struct ContactOutcome {
    /// The record as persisted.
    pub record: ContactRecord,
    /// Set when geocoding failed and the record was stored without
    /// coordinates.
    pub geocode_warning: Option<String>,
}

/// Contact operations for one authenticated user.
///
/// Constructed per request from the shared application state; the table
/// cache outlives the request and is keyed by username.
pub struct ContactService<'a, S, G> {
    storage: UserStorage<S>,
    geocoder: &'a G,
    cache: Cache<Username, ContactTable>,
    user: Username,
}

impl<'a, S: RemoteStore, G: Geocoder> ContactService<'a, S, G> {
    /// Create a service bound to one user.
    pub const fn new(
        storage: UserStorage<S>,
        geocoder: &'a G,
        cache: Cache<Username, ContactTable>,
        user: Username,
    ) -> Self {
        Self {
            storage,
            geocoder,
            cache,
            user,
        }
    }

    /// The user's contact table.
    ///
    /// Served from the in-memory copy when present; otherwise loaded from
    /// the remote store. A user without a contacts file yet gets an empty
    /// table.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::Storage` on read failure or if the stored
    /// file is malformed.
    pub async fn table(&self) -> Result<ContactTable, ContactError> {
        if let Some(table) = self.cache.get(&self.user).await {
            return Ok(table);
        }

        let table = self.load_table().await?;
        self.cache.insert(self.user.clone(), table.clone()).await;
        Ok(table)
    }

    /// Validate, geocode and persist a new contact.
    ///
    /// The updated table is written back to the remote store with a change
    /// note naming the contact; the in-memory copy advances only after that
    /// write succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::Validation` for empty fields or
    /// `ContactError::Storage` if persisting fails. A geocoding failure is
    /// not an error; it surfaces as a warning on the outcome.
    pub async fn add_contact(&self, fields: ContactFields) -> Result<ContactOutcome, ContactError> {
        fields.validate()?;

        let (coordinates, geocode_warning) = match self
            .geocoder
            .lookup(&fields.street, &fields.postal_code, &fields.city)
            .await
        {
            Ok(coordinates) => (Some(coordinates), None),
            Err(err) => {
                tracing::warn!(
                    user = %self.user,
                    error = %err,
                    "geocoding failed, storing contact without coordinates"
                );
                (
                    None,
                    Some(format!(
                        "Could not find coordinates for '{}, {} {}'",
                        fields.street, fields.postal_code, fields.city
                    )),
                )
            }
        };

        let record = ContactRecord {
            name: fields.name,
            street: fields.street,
            postal_code: fields.postal_code,
            city: fields.city,
            coordinates,
        };

        let mut table = self.table().await?;
        table.push(record.clone());

        let path = self.storage.full_path(CONTACTS_FILE)?;
        let change_note = format!("Add contact '{}' to the file {path}", record.name);
        self.storage
            .write_table(CONTACTS_FILE, &table.to_table(), &change_note)
            .await?;

        self.cache.insert(self.user.clone(), table).await;

        tracing::info!(user = %self.user, contact = %record.name, "contact added");
        Ok(ContactOutcome {
            record,
            geocode_warning,
        })
    }

    async fn load_table(&self) -> Result<ContactTable, ContactError> {
        let raw = match self.storage.read_table(CONTACTS_FILE).await {
            Ok(raw) => raw,
            Err(StorageError::NotFound(_)) => return Ok(ContactTable::new()),
            Err(other) => return Err(other.into()),
        };
        ContactTable::from_table(&raw).map_err(|e| {
            ContactError::Storage(StorageError::Malformed {
                path: self
                    .storage
                    .full_path(CONTACTS_FILE)
                    .map_or_else(|_| CONTACTS_FILE.to_string(), |p| p),
                reason: e.to_string(),
            })
        })
    }
}
