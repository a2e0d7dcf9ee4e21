//! Conversion between plain JSON field values and the typed value encoding
//! used on the wire (`{"stringValue": ..}`, `{"mapValue": {"fields": ..}}`).

use serde_json::{Map, Number, Value, json};

use fellowship_core::document::{Fields, Timestamp, is_server_timestamp};
use fellowship_core::error::{Error, InvalidInputError, ProtocolError};
use fellowship_core::Result;

const TIMESTAMP_KEYS: [&str; 4] = ["seconds", "nanoseconds", "_seconds", "_nanoseconds"];

/// Fields split into encoded values and server timestamp transforms.
#[derive(Debug)]
pub(crate) struct EncodedFields {
    pub fields: Map<String, Value>,
    /// Field paths whose value is the commit time.
    pub server_timestamps: Vec<String>,
}

/// Encode a document's fields for a write.
pub(crate) fn encode_fields(fields: &Fields) -> Result<EncodedFields> {
    let mut server_timestamps = Vec::new();
    let fields = encode_map(fields.as_map(), "", &mut server_timestamps)?;
    Ok(EncodedFields {
        fields,
        server_timestamps,
    })
}

fn encode_map(
    map: &Map<String, Value>,
    prefix: &str,
    transforms: &mut Vec<String>,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (key, value) in map {
        let path = if prefix.is_empty() {
            quote_segment(key)
        } else {
            format!("{}.{}", prefix, quote_segment(key))
        };

        if is_server_timestamp(value) {
            transforms.push(path);
            continue;
        }

        let encoded = match value {
            Value::Object(inner) if !is_timestamp_shape(inner) => {
                let fields = encode_map(inner, &path, transforms)?;
                json!({ "mapValue": { "fields": fields } })
            }
            other => encode_value(other)?,
        };
        out.insert(key.clone(), encoded);
    }
    Ok(out)
}

fn is_timestamp_shape(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.keys().all(|k| TIMESTAMP_KEYS.contains(&k.as_str()))
        && Timestamp::from_value(&Value::Object(map.clone())).is_some()
}

/// Encode a single value. Server timestamps are only accepted as map fields.
pub(crate) fn encode_value(value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| {
                    if is_server_timestamp(item) {
                        Err(Error::InvalidInput(InvalidInputError::Fields {
                            reason: "server timestamps cannot be placed inside arrays".to_string(),
                        }))
                    } else {
                        encode_value(item)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) if is_timestamp_shape(map) => {
            let ts = Timestamp::from_value(value).ok_or_else(|| unsupported("timestamp"))?;
            let rfc = ts.to_rfc3339().ok_or_else(|| unsupported("timestamp out of range"))?;
            json!({ "timestampValue": rfc })
        }
        Value::Object(map) => {
            let mut nested = Vec::new();
            let fields = encode_map(map, "", &mut nested)?;
            if !nested.is_empty() {
                return Err(Error::InvalidInput(InvalidInputError::Fields {
                    reason: "server timestamps cannot be placed inside arrays".to_string(),
                }));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    })
}

fn unsupported(what: &str) -> Error {
    Error::InvalidInput(InvalidInputError::Fields {
        reason: format!("cannot encode {}", what),
    })
}

fn malformed(reason: String) -> Error {
    Error::Protocol(ProtocolError::new(200, Some("MALFORMED_VALUE".to_string()), Some(reason)))
}

/// Decode the `fields` object of a wire document.
pub(crate) fn decode_fields(fields: Map<String, Value>) -> Result<Fields> {
    let decoded = fields
        .into_iter()
        .map(|(k, v)| Ok((k, decode_value(v)?)))
        .collect::<Result<Map<_, _>>>()?;
    Fields::from_map(decoded)
}

/// Decode one typed wire value into plain JSON.
///
/// Timestamps become the structured `{"seconds", "nanoseconds"}` shape.
pub(crate) fn decode_value(value: Value) -> Result<Value> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Err(malformed(format!("expected a typed value, got {}", other))),
    };

    let Some((kind, inner)) = map.iter_mut().next().map(|(k, v)| (k.clone(), v.take())) else {
        return Err(malformed("empty typed value".to_string()));
    };

    Ok(match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => {
            let n = match &inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            }
            .ok_or_else(|| malformed(format!("bad integer {}", inner)))?;
            Value::from(n)
        }
        "doubleValue" => match inner {
            Value::Number(n) => Value::Number(n),
            // NaN and the infinities arrive as strings and have no JSON form.
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        "stringValue" | "referenceValue" | "bytesValue" => inner,
        "timestampValue" => {
            let s = inner
                .as_str()
                .ok_or_else(|| malformed(format!("bad timestamp {}", inner)))?;
            Timestamp::parse_rfc3339(s)?.to_value()
        }
        "geoPointValue" => inner,
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            Value::Array(values.into_iter().map(decode_value).collect::<Result<_>>()?)
        }
        "mapValue" => {
            let fields = match inner {
                Value::Object(mut m) => match m.remove("fields") {
                    Some(Value::Object(fields)) => fields,
                    _ => Map::new(),
                },
                _ => Map::new(),
            };
            decode_fields(fields)?.into_value()
        }
        other => return Err(malformed(format!("unknown value type '{}'", other))),
    })
}

/// Quote a field path segment unless it is a simple identifier.
pub(crate) fn quote_segment(segment: &str) -> String {
    let simple = segment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Encode a dotted field path, quoting each segment as needed.
pub(crate) fn field_path(path: &str) -> String {
    path.split('.').map(quote_segment).collect::<Vec<_>>().join(".")
}
