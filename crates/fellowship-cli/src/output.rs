//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};

use fellowship::{Origin, RemoteDocument};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning to stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// A document flattened into one object with its id under `id`.
pub fn document_value(doc: &RemoteDocument) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(doc.id.to_string()));
    for (key, value) in doc.fields.iter() {
        object.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Value::Object(object)
}

/// Print one document as JSON, or as `id<TAB>date` when a date field is
/// given.
pub fn document(doc: &RemoteDocument, date_field: Option<&str>, pretty: bool) -> Result<()> {
    match date_field {
        Some(path) => {
            println!("{}\t{}", doc.id, doc.display_date(path));
            Ok(())
        }
        None if pretty => json_pretty(&document_value(doc)),
        None => json(&document_value(doc)),
    }
}

/// Note on stderr that results came from the cache.
pub fn origin(origin: Origin) {
    if origin == Origin::Cache {
        warning("Store unreachable, showing cached results");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fellowship::{DocumentId, Fields};
    use serde_json::json;

    #[test]
    fn document_value_prefers_store_id() {
        let doc = RemoteDocument::new(
            DocumentId::new("e1").unwrap(),
            Fields::new(json!({ "title": "Potluck", "id": "shadowed" })).unwrap(),
        );

        let value = document_value(&doc);
        assert_eq!(value["id"], json!("e1"));
        assert_eq!(value["title"], json!("Potluck"));
    }
}
