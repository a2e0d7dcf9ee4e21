//! Timestamps, server timestamp sentinels, and display-safe date rendering.
//!
//! Documents written by the store carry structured timestamps
//! (`{"seconds": .., "nanoseconds": ..}`). Documents written through other
//! paths, such as a web console, often carry plain strings instead. Both
//! shapes are accepted on the read path; only structured timestamps render
//! as a date.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, InvalidInputError};

/// Label shown for dates that cannot be rendered.
pub const DATE_FALLBACK_LABEL: &str = "Date TBD";

const DISPLAY_FORMAT: &str = "%b %-d, %Y";
const SENTINEL_KEY: &str = ".sv";
const SENTINEL_VALUE: &str = "timestamp";

/// A point in time as stored by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    /// Create a timestamp, rejecting out-of-range nanoseconds.
    pub fn new(seconds: i64, nanoseconds: u32) -> Result<Self, Error> {
        if nanoseconds >= 1_000_000_000 {
            return Err(InvalidInputError::Other {
                message: format!("nanoseconds out of range: {}", nanoseconds),
            }
            .into());
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    /// The current time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }

    /// Read a structured timestamp from a field value.
    ///
    /// Accepts `{"seconds", "nanoseconds"}` and the underscore-prefixed
    /// variant some admin exports produce. Returns `None` for anything else,
    /// including plain strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let seconds = obj.get("seconds").or_else(|| obj.get("_seconds"))?.as_i64()?;
        let nanoseconds = obj
            .get("nanoseconds")
            .or_else(|| obj.get("_nanoseconds"))
            .map_or(Some(0), Value::as_u64)?;
        Self::new(seconds, u32::try_from(nanoseconds).ok()?).ok()
    }

    /// Parse a legacy string date: RFC 3339 or `YYYY-MM-DD` (midnight UTC).
    pub fn parse_legacy(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        Some(Self::from_datetime(Utc.from_utc_datetime(&midnight)))
    }

    /// Parse an RFC 3339 string, as used on the REST wire.
    pub fn parse_rfc3339(s: &str) -> Result<Self, Error> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| {
                InvalidInputError::Other {
                    message: format!("invalid timestamp '{}': {}", s, e),
                }
                .into()
            })
    }

    pub fn to_rfc3339(&self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
    }

    /// The structured field value for this timestamp.
    pub fn to_value(&self) -> Value {
        json!({ "seconds": self.seconds, "nanoseconds": self.nanoseconds })
    }

    /// Human-readable date, or the fallback label when out of range.
    pub fn display(&self) -> String {
        self.to_datetime()
            .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|| DATE_FALLBACK_LABEL.to_string())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.seconds, self.nanoseconds).cmp(&(other.seconds, other.nanoseconds))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(s) => f.write_str(&s),
            None => write!(f, "{}s+{}ns", self.seconds, self.nanoseconds),
        }
    }
}

/// Render any field value as a display-safe date.
///
/// The value is checked for the structured timestamp shape before it is
/// converted; every other shape, strings included, yields
/// [`DATE_FALLBACK_LABEL`].
pub fn display_date(value: &Value) -> String {
    match Timestamp::from_value(value) {
        Some(ts) => ts.display(),
        None => DATE_FALLBACK_LABEL.to_string(),
    }
}

/// The field value asking the store to substitute its commit time.
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

/// Returns true if the value is the server timestamp sentinel.
pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.get(SENTINEL_KEY) == Some(&json!(SENTINEL_VALUE)))
}

/// A date field normalized at the read boundary.
///
/// Structured timestamps and parseable legacy strings become
/// [`DateField::Timestamp`]; other strings are kept verbatim so nothing is
/// lost, but render as the fallback label.
#[derive(Debug, Clone, PartialEq)]
pub enum DateField {
    Timestamp(Timestamp),
    Legacy(String),
}

impl DateField {
    /// Normalize a stored value. Returns `None` for values that are not
    /// dates in either shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(ts) = Timestamp::from_value(value) {
            return Some(DateField::Timestamp(ts));
        }
        let s = value.as_str()?;
        Some(match Timestamp::parse_legacy(s) {
            Some(ts) => DateField::Timestamp(ts),
            None => DateField::Legacy(s.to_string()),
        })
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            DateField::Timestamp(ts) => Some(*ts),
            DateField::Legacy(_) => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            DateField::Timestamp(ts) => ts.display(),
            DateField::Legacy(_) => DATE_FALLBACK_LABEL.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DateField::Timestamp(ts) => ts.to_value(),
            DateField::Legacy(s) => Value::String(s.clone()),
        }
    }
}

impl From<Timestamp> for DateField {
    fn from(ts: Timestamp) -> Self {
        DateField::Timestamp(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_string_date_renders_fallback_label() {
        assert_eq!(display_date(&json!("next Sunday")), DATE_FALLBACK_LABEL);
        assert_eq!(display_date(&json!("2024-03-10")), DATE_FALLBACK_LABEL);
        assert_eq!(display_date(&json!(42)), DATE_FALLBACK_LABEL);
        assert_eq!(display_date(&Value::Null), DATE_FALLBACK_LABEL);
    }

    #[test]
    fn structured_timestamp_renders_date() {
        // 2024-03-10T15:00:00Z
        let value = json!({ "seconds": 1_710_082_800, "nanoseconds": 0 });
        assert_eq!(display_date(&value), "Mar 10, 2024");
    }

    #[test]
    fn accepts_underscore_export_shape() {
        let value = json!({ "_seconds": 1_710_082_800, "_nanoseconds": 5 });
        let ts = Timestamp::from_value(&value).unwrap();
        assert_eq!(ts.seconds, 1_710_082_800);
        assert_eq!(ts.nanoseconds, 5);
    }

    #[test]
    fn rejects_malformed_structures() {
        assert!(Timestamp::from_value(&json!({ "seconds": "soon" })).is_none());
        assert!(Timestamp::from_value(&json!({ "seconds": 1, "nanoseconds": 2_000_000_000u64 })).is_none());
    }

    #[test]
    fn parses_legacy_strings() {
        let rfc = Timestamp::parse_legacy("2024-03-10T15:00:00Z").unwrap();
        assert_eq!(rfc.seconds, 1_710_082_800);

        let day = Timestamp::parse_legacy("2024-03-10").unwrap();
        assert_eq!(day.seconds, 1_710_028_800);

        assert!(Timestamp::parse_legacy("after the service").is_none());
    }

    #[test]
    fn date_field_normalizes_shapes() {
        let structured = DateField::from_value(&json!({ "seconds": 10, "nanoseconds": 0 }));
        assert!(matches!(structured, Some(DateField::Timestamp(_))));

        let iso = DateField::from_value(&json!("2024-03-10"));
        assert!(matches!(iso, Some(DateField::Timestamp(_))));

        let legacy = DateField::from_value(&json!("Easter weekend")).unwrap();
        assert_eq!(legacy, DateField::Legacy("Easter weekend".to_string()));
        assert_eq!(legacy.display(), DATE_FALLBACK_LABEL);

        assert!(DateField::from_value(&json!(true)).is_none());
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_server_timestamp(&server_timestamp()));
        assert!(!is_server_timestamp(&json!({ ".sv": "timestamp", "x": 1 })));
        assert!(!is_server_timestamp(&json!("timestamp")));
    }

    #[test]
    fn ordering_uses_nanoseconds() {
        let a = Timestamp::new(5, 1).unwrap();
        let b = Timestamp::new(5, 2).unwrap();
        assert!(a < b);
    }
}
