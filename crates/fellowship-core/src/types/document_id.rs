//! Document id type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{Error, InvalidInputError};

const MAX_BYTES: usize = 1500;
const AUTO_ID_LEN: usize = 20;
const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A validated document id, unique within its collection.
///
/// # Example
///
/// ```
/// use fellowship_core::DocumentId;
///
/// let id = DocumentId::generate();
/// assert_eq!(id.as_str().len(), 20);
/// assert!(DocumentId::new("a/b").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new document id, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Generate a random 20-character alphanumeric id.
    pub fn generate() -> Self {
        let bytes = [Uuid::new_v4().into_bytes(), Uuid::new_v4().into_bytes()].concat();
        let id = bytes
            .iter()
            .take(AUTO_ID_LEN)
            .map(|b| AUTO_ID_ALPHABET[*b as usize % AUTO_ID_ALPHABET.len()] as char)
            .collect();
        Self(id)
    }

    /// Returns the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let reason = if s.is_empty() {
            Some("cannot be empty")
        } else if s.len() > MAX_BYTES {
            Some("longer than 1500 bytes")
        } else if s == "." || s == ".." {
            Some("cannot be '.' or '..'")
        } else if s.contains('/') {
            Some("cannot contain '/'")
        } else if s.chars().any(char::is_control) {
            Some("cannot contain control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InvalidInputError::DocumentId {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_alphanumeric_and_distinct() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_eq!(a.as_str().len(), AUTO_ID_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_invalid_ids() {
        for id in ["", ".", "..", "a/b", "tab\there"] {
            assert!(DocumentId::new(id).is_err(), "{id:?}");
        }
    }

    #[test]
    fn accepts_user_ids() {
        assert!(DocumentId::new("kX9fQ2mZ7bYw1LpA3cDe").is_ok());
        assert!(DocumentId::new("sunday-service-2024").is_ok());
    }
}
