//! A single stored document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DocumentId;

use super::{Fields, display_date};

/// A document fetched from (or destined for) a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    /// Id, unique within the document's collection.
    pub id: DocumentId,

    /// Field values.
    ///
    /// Guaranteed to be a JSON object; no further schema is enforced.
    pub fields: Fields,
}

impl RemoteDocument {
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Look up a field by dotted path (`"location.room"`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.lookup(path)
    }

    /// Display-safe rendering of a date field.
    ///
    /// Never fails: missing fields and legacy string dates render as the
    /// fallback label.
    pub fn display_date(&self, path: &str) -> String {
        match self.get(path) {
            Some(value) => display_date(value),
            None => display_date(&Value::Null),
        }
    }
}
