//! Header-row tabular text codec.
//!
//! Every table persisted to the remote store (the credential table, the
//! per-user contact tables) is a plain text file: one header row naming the
//! columns, then one row per record. Fields containing commas, quotes or
//! newlines are quoted, with embedded quotes doubled (RFC 4180 style).
//!
//! The codec is deliberately lossless: `Table::parse(&t.encode())` yields a
//! table equal to `t`.

use thiserror::Error;

/// Errors that can occur when parsing a [`Table`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The input has no header row.
    #[error("table has no header row")]
    MissingHeader,
    /// A row has a different number of fields than the header.
    #[error("row {row} has {found} fields, header has {expected}")]
    ColumnCount {
        /// 1-based row number (header is row 1).
        row: usize,
        /// Number of columns declared by the header.
        expected: usize,
        /// Number of fields found in the row.
        found: usize,
    },
    /// A quoted field is never closed.
    #[error("unterminated quoted field starting in row {row}")]
    UnterminatedQuote {
        /// 1-based row number where the field started.
        row: usize,
    },
    /// A required column is missing from the header.
    #[error("missing column '{0}'")]
    MissingColumn(String),
}

/// An ordered table of string fields with named columns.
///
/// Row order is preserved exactly; consumers rely on insertion order being
/// display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// The column names, in file order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows, in file order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows (excluding the header).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns `TableError::ColumnCount` if the row width does not match the
    /// header.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::ColumnCount {
                row: self.rows.len() + 2,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of a column by name, erroring if absent.
    ///
    /// # Errors
    ///
    /// Returns `TableError::MissingColumn` if the header lacks the column.
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Encode the table as text: header row followed by data rows.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        encode_row(&mut out, &self.columns);
        for row in &self.rows {
            encode_row(&mut out, row);
        }
        out
    }

    /// Parse a table from text.
    ///
    /// # Errors
    ///
    /// Returns `TableError` if the header is missing, a quoted field is
    /// unterminated, or a row width does not match the header.
    pub fn parse(input: &str) -> Result<Self, TableError> {
        let mut records = parse_records(input)?;
        if records.is_empty() {
            return Err(TableError::MissingHeader);
        }
        let columns = records.remove(0);
        let expected = columns.len();
        for (i, row) in records.iter().enumerate() {
            if row.len() != expected {
                return Err(TableError::ColumnCount {
                    row: i + 2,
                    expected,
                    found: row.len(),
                });
            }
        }
        Ok(Self {
            columns,
            rows: records,
        })
    }
}

/// Append one encoded row (with trailing newline) to `out`.
fn encode_row(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            for c in field.chars() {
                if c == '"' {
                    out.push('"');
                }
                out.push(c);
            }
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Split input into records of fields, honoring quoting.
fn parse_records(input: &str) -> Result<Vec<Vec<String>>, TableError> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started_row = 1usize;
    let mut row = 1usize;
    // Tracks whether the current record has any content; a trailing newline
    // must not produce a phantom empty record.
    let mut record_dirty = false;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '\n' => {
                    row += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                field_started_row = row;
                record_dirty = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                record_dirty = true;
            }
            '\r' => {
                // Swallow the CR of a CRLF pair; a bare CR is data.
                if chars.peek() != Some(&'\n') {
                    field.push(c);
                }
            }
            '\n' => {
                if record_dirty || !field.is_empty() {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                record_dirty = false;
                row += 1;
            }
            _ => {
                field.push(c);
                record_dirty = true;
            }
        }
    }

    if in_quotes {
        return Err(TableError::UnterminatedQuote {
            row: field_started_row,
        });
    }
    if record_dirty || !field.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
