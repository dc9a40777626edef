//! Credential domain types.
//!
//! The credential table is the authoritative mapping of usernames to hashed
//! secrets and profile metadata. It lives at a fixed path in the remote
//! store and is only ever mutated by successful registration.

use chrono::{DateTime, Utc};

use crate::table::{Table, TableError};
use crate::types::username::{Username, UsernameError};

/// Separator for the serialized roles list.
const ROLES_SEPARATOR: char = ';';

/// One user's credential record.
///
/// The secret is only ever stored as a password hash (PHC string); the clear
/// form never appears in this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Unique username, the table key.
    pub username: Username,
    /// Hashed secret in PHC string format.
    pub password_hash: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Contact email address.
    pub email: String,
    /// Assigned roles, free-form.
    pub roles: Vec<String>,
    /// When the user registered.
    pub registered_at: DateTime<Utc>,
}

/// Error returned when inserting a record whose username is already taken.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("username '{0}' already exists")]
pub struct DuplicateUsername(pub Username);

/// Errors that can occur when decoding a [`CredentialTable`].
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum CredentialTableError {
    /// The underlying tabular file is malformed.
    #[error(transparent)]
    Table(#[from] TableError),
    /// A stored username is invalid.
    #[error("row {row}: {source}")]
    InvalidUsername {
        /// 1-based data row number.
        row: usize,
        /// The underlying parse error.
        source: UsernameError,
    },
    /// A registration timestamp is not RFC 3339.
    #[error("row {row}: invalid timestamp '{value}'")]
    InvalidTimestamp {
        /// 1-based data row number.
        row: usize,
        /// The offending field value.
        value: String,
    },
    /// Two rows share a username.
    #[error(transparent)]
    Duplicate(#[from] DuplicateUsername),
}

/// The credential table: an ordered sequence of records keyed by username.
///
/// File order is preserved; usernames are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialTable {
    records: Vec<CredentialRecord>,
}

impl CredentialTable {
    /// Column names of the persisted file, in order.
    pub const COLUMNS: [&'static str; 6] = [
        "username",
        "password_hash",
        "display_name",
        "email",
        "roles",
        "registered_at",
    ];

    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records, in file order.
    #[must_use]
    pub fn records(&self) -> &[CredentialRecord] {
        &self.records
    }

    /// Look up a record by username.
    #[must_use]
    pub fn get(&self, username: &Username) -> Option<&CredentialRecord> {
        self.records.iter().find(|r| &r.username == username)
    }

    /// Whether a username is present.
    #[must_use]
    pub fn contains(&self, username: &Username) -> bool {
        self.get(username).is_some()
    }

    /// Insert a record, enforcing username uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateUsername` (leaving the table unchanged) if the
    /// username is already present.
    pub fn insert(&mut self, record: CredentialRecord) -> Result<(), DuplicateUsername> {
        if self.contains(&record.username) {
            return Err(DuplicateUsername(record.username));
        }
        self.records.push(record);
        Ok(())
    }

    /// Encode as a tabular file with the fixed column set.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(Self::COLUMNS);
        for record in &self.records {
            let row = vec![
                record.username.to_string(),
                record.password_hash.clone(),
                record.display_name.clone(),
                record.email.clone(),
                record.roles.join(&ROLES_SEPARATOR.to_string()),
                record.registered_at.to_rfc3339(),
            ];
            // Width always matches COLUMNS.
            let _ = table.push_row(row);
        }
        table
    }

    /// Decode from a tabular file.
    ///
    /// # Errors
    ///
    /// Returns `CredentialTableError` if a required column is missing, a
    /// username or timestamp fails to parse, or usernames collide.
    pub fn from_table(table: &Table) -> Result<Self, CredentialTableError> {
        let username = table.require_column("username")?;
        let password_hash = table.require_column("password_hash")?;
        let display_name = table.require_column("display_name")?;
        let email = table.require_column("email")?;
        let roles = table.require_column("roles")?;
        let registered_at = table.require_column("registered_at")?;

        let mut out = Self::new();
        for (i, row) in table.rows().iter().enumerate() {
            let field = |idx: usize| row.get(idx).cloned().unwrap_or_default();

            let username = Username::parse(&field(username)).map_err(|source| {
                CredentialTableError::InvalidUsername { row: i + 1, source }
            })?;
            let raw_ts = field(registered_at);
            let registered_at = DateTime::parse_from_rfc3339(&raw_ts)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| CredentialTableError::InvalidTimestamp {
                    row: i + 1,
                    value: raw_ts,
                })?;
            let roles_field = field(roles);
            let roles = if roles_field.is_empty() {
                Vec::new()
            } else {
                roles_field
                    .split(ROLES_SEPARATOR)
                    .map(ToString::to_string)
                    .collect()
            };

            out.insert(CredentialRecord {
                username,
                password_hash: field(password_hash),
                display_name: field(display_name),
                email: field(email),
                roles,
                registered_at,
            })?;
        }
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn record(username: &str) -> CredentialRecord {
        CredentialRecord {
            username: Username::parse(username).unwrap(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            display_name: "Alice Example".to_string(),
            email: "alice@example.com".to_string(),
            roles: vec!["user".to_string()],
            registered_at: "2025-06-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut table = CredentialTable::new();
        table.insert(record("alice")).unwrap();

        let alice = Username::parse("alice").unwrap();
        assert!(table.contains(&alice));
        assert_eq!(table.get(&alice).unwrap().display_name, "Alice Example");
    }

    #[test]
    fn test_insert_duplicate_leaves_table_unchanged() {
        let mut table = CredentialTable::new();
        table.insert(record("alice")).unwrap();

        let mut second = record("alice");
        second.display_name = "Impostor".to_string();
        let err = table.insert(second).unwrap_err();

        assert_eq!(err.0.as_str(), "alice");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get(&Username::parse("alice").unwrap()).unwrap().display_name,
            "Alice Example"
        );
    }

    #[test]
    fn test_round_trip() {
        let mut table = CredentialTable::new();
        table.insert(record("alice")).unwrap();
        let mut bob = record("bob");
        bob.roles = vec!["user".to_string(), "admin".to_string()];
        bob.email = "bob@example.com".to_string();
        table.insert(bob).unwrap();

        let encoded = table.to_table().encode();
        let decoded =
            CredentialTable::from_table(&Table::parse(&encoded).unwrap()).unwrap();

        assert_eq!(decoded, table);
    }

    #[test]
    fn test_empty_roles_round_trip() {
        let mut table = CredentialTable::new();
        let mut alice = record("alice");
        alice.roles = Vec::new();
        table.insert(alice).unwrap();

        let decoded = CredentialTable::from_table(&table.to_table()).unwrap();
        assert!(decoded.records()[0].roles.is_empty());
    }

    #[test]
    fn test_from_table_rejects_duplicate_rows() {
        let mut raw = CredentialTable::new();
        raw.insert(record("alice")).unwrap();
        let mut encoded = raw.to_table().encode();
        // Duplicate the data row.
        let data_row = encoded.lines().nth(1).unwrap().to_string();
        encoded.push_str(&data_row);
        encoded.push('\n');

        let err = CredentialTable::from_table(&Table::parse(&encoded).unwrap()).unwrap_err();
        assert!(matches!(err, CredentialTableError::Duplicate(_)));
    }

    #[test]
    fn test_from_table_rejects_bad_timestamp() {
        let mut raw = Table::new(CredentialTable::COLUMNS);
        raw.push_row(vec![
            "alice".into(),
            "hash".into(),
            "Alice".into(),
            "alice@example.com".into(),
            String::new(),
            "not-a-date".into(),
        ])
        .unwrap();

        assert!(matches!(
            CredentialTable::from_table(&raw),
            Err(CredentialTableError::InvalidTimestamp { row: 1, .. })
        ));
    }
}
