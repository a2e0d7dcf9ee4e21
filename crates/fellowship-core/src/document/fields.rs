//! Validated document field map.
//!
//! This module provides [`Fields`], a type that guarantees the value is a
//! JSON object with non-empty field names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};

use super::timestamp::{Timestamp, is_server_timestamp};

/// The field values of a document.
///
/// This type guarantees that:
/// - The value is a JSON object
/// - Every field name is non-empty
///
/// These invariants are enforced at construction and deserialization time.
///
/// # Example
///
/// ```
/// use fellowship_core::Fields;
/// use serde_json::json;
///
/// let fields = Fields::new(json!({
///     "title": "Sunday Service",
///     "location": { "room": "Sanctuary" }
/// })).unwrap();
///
/// assert_eq!(fields.lookup("location.room").unwrap(), "Sanctuary");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// Create field values from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a JSON object or has an empty
    /// field name.
    pub fn new(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(Error::InvalidInput(InvalidInputError::Fields {
                reason: "document fields must be a JSON object".to_string(),
            })),
        }
    }

    /// Create field values from an already-built JSON map.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, Error> {
        if map.keys().any(|k| k.is_empty()) {
            return Err(Error::InvalidInput(InvalidInputError::Fields {
                reason: "field names cannot be empty".to_string(),
            }));
        }
        Ok(Self(map))
    }

    /// An empty field map.
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Get a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a field by dotted path, descending into nested maps.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set a top-level field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Remove a top-level field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite the given top-level fields, leaving every other field as is.
    pub fn merge(&mut self, other: &Fields) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Names of top-level fields holding the server timestamp sentinel.
    pub fn server_timestamp_fields(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, v)| is_server_timestamp(v))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Replace every server timestamp sentinel, at any depth, with `now`.
    pub fn resolve_server_timestamps(&mut self, now: Timestamp) {
        for value in self.0.values_mut() {
            resolve_value(value, now);
        }
    }

    /// Get a reference to the inner JSON map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume and return the inner JSON map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consume and return the fields as a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn resolve_value(value: &mut Value, now: Timestamp) {
    if is_server_timestamp(value) {
        *value = now.to_value();
        return;
    }
    match value {
        Value::Object(map) => map.values_mut().for_each(|v| resolve_value(v, now)),
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_value(v, now)),
        _ => {}
    }
}

impl Serialize for Fields {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Fields::new(value).map_err(serde::de::Error::custom)
    }
}
