//! Typed collection records.
//!
//! Each collection the community app uses gets a struct with its fields
//! declared up front. Stored documents are normalized into these types once,
//! at the read boundary: string dates written by older clients or by hand
//! become [`DateField`]s, and missing optional fields become `None`.

mod announcement;
mod event;
mod group;
mod member;

pub use announcement::Announcement;
pub use event::Event;
pub use group::Group;
pub use member::Member;

use serde_json::Value;

use crate::Result;
use crate::document::{DateField, Fields, RemoteDocument};
use crate::error::InvalidInputError;

/// A struct view of the documents in one collection.
pub trait CollectionRecord: Sized {
    /// Name of the collection holding these records.
    const COLLECTION: &'static str;

    /// Normalize a stored document into this record type.
    fn from_document(doc: &RemoteDocument) -> Result<Self>;

    /// Fields to write for this record.
    ///
    /// Attribution fields (`createdBy`, `createdAt`) are not included; the
    /// accessor stamps them on create.
    fn to_fields(&self) -> Fields;
}

pub(crate) fn invalid(doc: &RemoteDocument, collection: &str, reason: impl Into<String>) -> crate::Error {
    InvalidInputError::Document {
        collection: collection.to_string(),
        id: doc.id.to_string(),
        reason: reason.into(),
    }
    .into()
}

pub(crate) fn required_str(doc: &RemoteDocument, collection: &str, field: &str) -> Result<String> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(invalid(doc, collection, format!("'{}' is empty", field))),
        Some(_) => Err(invalid(doc, collection, format!("'{}' is not a string", field))),
        None => Err(invalid(doc, collection, format!("missing '{}'", field))),
    }
}

/// Strings pass through; numbers and booleans are stringified; anything
/// else reads as absent.
pub(crate) fn optional_str(doc: &RemoteDocument, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn optional_date(doc: &RemoteDocument, field: &str) -> Option<DateField> {
    doc.get(field).and_then(DateField::from_value)
}

pub(crate) fn string_list(doc: &RemoteDocument, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn put_opt(fields: &mut Fields, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        fields.insert(key, Value::String(v.clone()));
    }
}

pub(crate) fn put_date(fields: &mut Fields, key: &str, value: &Option<DateField>) {
    if let Some(v) = value {
        fields.insert(key, v.to_value());
    }
}
