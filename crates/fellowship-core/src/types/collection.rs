//! Collection name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

const MAX_LEN: usize = 100;

/// A validated collection name such as `events` or `announcements`.
///
/// # Example
///
/// ```
/// use fellowship_core::CollectionName;
///
/// let events = CollectionName::new("events").unwrap();
/// assert_eq!(events.as_str(), "events");
/// assert!(CollectionName::new("events/abc").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Create a new collection name, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the collection name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let fail = |reason: &str| -> Result<(), Error> {
            Err(InvalidInputError::CollectionName {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into())
        };

        if s.is_empty() {
            return fail("cannot be empty");
        }
        if s.len() > MAX_LEN {
            return fail("longer than 100 characters");
        }
        if s == "." || s == ".." {
            return fail("cannot be '.' or '..'");
        }
        if s.starts_with("__") {
            return fail("names starting with '__' are reserved");
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return fail(&format!("invalid character '{}'", c));
        }

        Ok(())
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CollectionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
