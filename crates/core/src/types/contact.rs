//! Contact domain types.
//!
//! A contact table is one per-user ordered file in the remote store;
//! insertion order is display order.

use serde::{Deserialize, Serialize};

use crate::table::{Table, TableError};

/// Geographic coordinates attached to a geocoded contact.
///
/// Latitude and longitude are always both present or both absent, so a
/// contact carries an `Option<Coordinates>` rather than two independent
/// optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// A single contact entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Contact name.
    pub name: String,
    /// Street and house number.
    pub street: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
    /// Geocoded coordinates; absent when geocoding failed.
    pub coordinates: Option<Coordinates>,
}

/// Errors that can occur when decoding a [`ContactTable`] from a [`Table`].
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ContactTableError {
    /// The underlying tabular file is malformed.
    #[error(transparent)]
    Table(#[from] TableError),
    /// A latitude or longitude field is not a number.
    #[error("row {row}: invalid coordinate '{value}'")]
    InvalidCoordinate {
        /// 1-based data row number.
        row: usize,
        /// The offending field value.
        value: String,
    },
    /// A row has a latitude without a longitude or vice versa.
    #[error("row {row}: latitude and longitude must both be present or both absent")]
    HalfCoordinate {
        /// 1-based data row number.
        row: usize,
    },
}

/// An ordered collection of contact records for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactTable {
    records: Vec<ContactRecord>,
}

impl ContactTable {
    /// Column names of the persisted file, in order.
    pub const COLUMNS: [&'static str; 6] =
        ["name", "street", "postal_code", "city", "lat", "lon"];

    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// The records, in insertion order.
    #[must_use]
    pub fn records(&self) -> &[ContactRecord] {
        &self.records
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

    /// The most recently added record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&ContactRecord> {
        self.records.last()
    }

    /// Append a record.
    pub fn push(&mut self, record: ContactRecord) {
        self.records.push(record);
    }

    /// Encode as a tabular file with the fixed column set.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(Self::COLUMNS);
        for record in &self.records {
            let (lat, lon) = record.coordinates.map_or_else(
                || (String::new(), String::new()),
                |c| (c.lat.to_string(), c.lon.to_string()),
            );
            let row = vec![
                record.name.clone(),
                record.street.clone(),
                record.postal_code.clone(),
                record.city.clone(),
                lat,
                lon,
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
    /// Returns `ContactTableError` if a required column is missing, a
    /// coordinate is not a number, or only one half of a coordinate pair is
    /// present.
    pub fn from_table(table: &Table) -> Result<Self, ContactTableError> {
        let name = table.require_column("name")?;
        let street = table.require_column("street")?;
        let postal_code = table.require_column("postal_code")?;
        let city = table.require_column("city")?;
        let lat = table.require_column("lat")?;
        let lon = table.require_column("lon")?;

        let mut records = Vec::with_capacity(table.len());
        for (i, row) in table.rows().iter().enumerate() {
            let field = |idx: usize| row.get(idx).cloned().unwrap_or_default();
            let coordinates =
                parse_coordinates(&field(lat), &field(lon)).map_err(|e| match e {
                    CoordinateParse::Invalid(value) => ContactTableError::InvalidCoordinate {
                        row: i + 1,
                        value,
                    },
                    CoordinateParse::Half => ContactTableError::HalfCoordinate { row: i + 1 },
                })?;
            records.push(ContactRecord {
                name: field(name),
                street: field(street),
                postal_code: field(postal_code),
                city: field(city),
                coordinates,
            });
        }
        Ok(Self { records })
    }
}

impl IntoIterator for ContactTable {
    type Item = ContactRecord;
    type IntoIter = std::vec::IntoIter<ContactRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

enum CoordinateParse {
    Invalid(String),
    Half,
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<Option<Coordinates>, CoordinateParse> {
    match (lat.trim(), lon.trim()) {
        ("", "") => Ok(None),
        ("", _) | (_, "") => Err(CoordinateParse::Half),
        (lat, lon) => {
            let lat = lat
                .parse::<f64>()
                .map_err(|_| CoordinateParse::Invalid(lat.to_string()))?;
            let lon = lon
                .parse::<f64>()
                .map_err(|_| CoordinateParse::Invalid(lon.to_string()))?;
            Ok(Some(Coordinates { lat, lon }))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sample(name: &str, coordinates: Option<Coordinates>) -> ContactRecord {
        ContactRecord {
            name: name.to_string(),
            street: "Main St 1".to_string(),
            postal_code: "12345".to_string(),
            city: "Springfield".to_string(),
            coordinates,
        }
    }

    #[test]
    fn test_round_trip_preserves_all_fields_and_order() {
        let mut table = ContactTable::new();
        table.push(sample("Bob", Some(Coordinates { lat: 39.8, lon: -89.6 })));
        table.push(sample("Alice", None));
        table.push(ContactRecord {
            name: "Müller, Hans".to_string(),
            street: "Haupt\"strasse\" 7".to_string(),
            postal_code: "8000".to_string(),
            city: "Zürich".to_string(),
            coordinates: Some(Coordinates {
                lat: 47.3769,
                lon: 8.5417,
            }),
        });

        let encoded = table.to_table().encode();
        let decoded =
            ContactTable::from_table(&crate::table::Table::parse(&encoded).unwrap()).unwrap();

        assert_eq!(decoded, table);
    }

    #[test]
    fn test_missing_coordinates_round_trip_as_absent() {
        let mut table = ContactTable::new();
        table.push(sample("Bob", None));

        let decoded =
            ContactTable::from_table(&table.to_table()).unwrap();
        assert_eq!(decoded.records()[0].coordinates, None);
    }

    #[test]
    fn test_from_table_rejects_half_coordinate() {
        let mut raw = Table::new(ContactTable::COLUMNS);
        raw.push_row(vec![
            "Bob".into(),
            "Main St".into(),
            "12345".into(),
            "Springfield".into(),
            "39.8".into(),
            String::new(),
        ])
        .unwrap();

        assert_eq!(
            ContactTable::from_table(&raw),
            Err(ContactTableError::HalfCoordinate { row: 1 })
        );
    }

    #[test]
    fn test_from_table_rejects_non_numeric_coordinate() {
        let mut raw = Table::new(ContactTable::COLUMNS);
        raw.push_row(vec![
            "Bob".into(),
            "Main St".into(),
            "12345".into(),
            "Springfield".into(),
            "north".into(),
            "-89.6".into(),
        ])
        .unwrap();

        assert!(matches!(
            ContactTable::from_table(&raw),
            Err(ContactTableError::InvalidCoordinate { row: 1, .. })
        ));
    }

    #[test]
    fn test_from_table_missing_column() {
        let raw = Table::parse("name,street\n").unwrap();
        assert!(matches!(
            ContactTable::from_table(&raw),
            Err(ContactTableError::Table(TableError::MissingColumn(_)))
        ));
    }

    #[test]
    fn test_last_and_len() {
        let mut table = ContactTable::new();
        assert!(table.is_empty());
        assert!(table.last().is_none());

        table.push(sample("Bob", None));
        table.push(sample("Alice", None));
        assert_eq!(table.len(), 2);
        assert_eq!(table.last().unwrap().name, "Alice");
    }
}
