use serde_json::Value;

use crate::Result;
use crate::document::{DateField, Fields, RemoteDocument};
use crate::types::DocumentId;

use super::{CollectionRecord, optional_date, optional_str, put_opt, required_str};

/// A notice posted to the congregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub id: Option<DocumentId>,
    pub title: String,
    pub content: String,
    /// Shown above other announcements when set.
    pub important: bool,
    pub author: Option<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateField>,
}

impl Announcement {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            important: false,
            author: None,
            created_by: None,
            created_at: None,
        }
    }
}

impl CollectionRecord for Announcement {
    const COLLECTION: &'static str = "announcements";

    fn from_document(doc: &RemoteDocument) -> Result<Self> {
        // Early clients stored the body under "message".
        let content = match optional_str(doc, "content") {
            Some(content) => content,
            None => required_str(doc, Self::COLLECTION, "message")?,
        };

        Ok(Self {
            id: Some(doc.id.clone()),
            title: required_str(doc, Self::COLLECTION, "title")?,
            content,
            important: doc.get("important").and_then(Value::as_bool).unwrap_or(false),
            author: optional_str(doc, "author"),
            created_by: optional_str(doc, "createdBy"),
            created_at: optional_date(doc, "createdAt"),
        })
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::empty();
        fields.insert("title", Value::String(self.title.clone()));
        fields.insert("content", Value::String(self.content.clone()));
        fields.insert("important", Value::Bool(self.important));
        put_opt(&mut fields, "author", &self.author);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> RemoteDocument {
        RemoteDocument::new(DocumentId::new("ann1").unwrap(), Fields::new(fields).unwrap())
    }

    #[test]
    fn reads_legacy_message_field() {
        let ann = Announcement::from_document(&doc(json!({
            "title": "Parking",
            "message": "The north lot is closed this week."
        })))
        .unwrap();
        assert_eq!(ann.content, "The north lot is closed this week.");
        assert!(!ann.important);
    }

    #[test]
    fn requires_some_body() {
        assert!(Announcement::from_document(&doc(json!({ "title": "Empty" }))).is_err());
    }
}
