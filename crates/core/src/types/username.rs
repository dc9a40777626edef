//! Username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input string is empty.
    #[error("username cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The first character is not a lowercase letter or digit.
    #[error("username must start with a lowercase letter or digit")]
    InvalidStart,
    /// The input contains a character outside the allowed set.
    #[error("username contains invalid character '{0}'")]
    InvalidChar(char),
}

/// A validated username.
///
/// Usernames key the credential table and namespace every per-user file in
/// the remote store (`user_data_<username>/...`), so the character set is
/// restricted to make path traversal impossible.
///
/// ## Constraints
///
/// - Length: 1-64 characters
/// - Allowed characters: `a-z`, `0-9`, `.`, `_`, `-`
/// - Must start with a lowercase letter or digit
///
/// ## Examples
///
/// ```
/// use mycontacts_core::Username;
///
/// assert!(Username::parse("alice").is_ok());
/// assert!(Username::parse("bob_92").is_ok());
///
/// assert!(Username::parse("").is_err());        // empty
/// assert!(Username::parse("Alice").is_err());   // uppercase
/// assert!(Username::parse("../etc").is_err());  // traversal characters
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Maximum length of a username.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Username` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Is longer than 64 characters
    /// - Does not start with a lowercase letter or digit
    /// - Contains characters outside `a-z 0-9 . _ -`
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        if s.is_empty() {
            return Err(UsernameError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let mut chars = s.chars();
        // Non-empty, checked above.
        if let Some(first) = chars.next()
            && !first.is_ascii_lowercase()
            && !first.is_ascii_digit()
        {
            return Err(UsernameError::InvalidStart);
        }

        for c in chars {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && !matches!(c, '.' | '_' | '-') {
                return Err(UsernameError::InvalidChar(c));
            }
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Username` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_usernames() {
        assert!(Username::parse("alice").is_ok());
        assert!(Username::parse("bob_92").is_ok());
        assert!(Username::parse("jo.doe-2").is_ok());
        assert!(Username::parse("7of9").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(Username::parse(""), Err(UsernameError::Empty)));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(65);
        assert!(matches!(
            Username::parse(&long),
            Err(UsernameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_start() {
        assert!(matches!(
            Username::parse("_alice"),
            Err(UsernameError::InvalidStart)
        ));
        assert!(matches!(
            Username::parse("-alice"),
            Err(UsernameError::InvalidStart)
        ));
    }

    #[test]
    fn test_parse_rejects_traversal_characters() {
        assert!(matches!(
            Username::parse("a/../b"),
            Err(UsernameError::InvalidChar('/'))
        ));
        assert!(matches!(
            Username::parse("a\\b"),
            Err(UsernameError::InvalidChar('\\'))
        ));
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!(Username::parse("Alice").is_err());
        assert!(Username::parse("aLice").is_err());
    }

    #[test]
    fn test_display_and_as_str() {
        let username = Username::parse("alice").unwrap();
        assert_eq!(format!("{username}"), "alice");
        assert_eq!(username.as_str(), "alice");
    }

    #[test]
    fn test_serde_roundtrip() {
        let username = Username::parse("alice").unwrap();
        let json = serde_json::to_string(&username).unwrap();
        assert_eq!(json, "\"alice\"");

        let parsed: Username = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, username);
    }

    #[test]
    fn test_from_str() {
        let username: Username = "alice".parse().unwrap();
        assert_eq!(username.as_str(), "alice");
    }
}
