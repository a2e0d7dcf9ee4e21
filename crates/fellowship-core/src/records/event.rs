use serde_json::Value;

use crate::Result;
use crate::document::{DateField, Fields, RemoteDocument};
use crate::types::DocumentId;

use super::{CollectionRecord, optional_date, optional_str, put_date, put_opt, required_str, string_list};

/// A scheduled church event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Option<DocumentId>,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<DateField>,
    /// Free-form start time as entered ("10:30 AM").
    pub time: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateField>,
}

impl Event {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            date: None,
            time: None,
            location: None,
            attendees: Vec::new(),
            created_by: None,
            created_at: None,
        }
    }

    /// Display-safe date label.
    pub fn date_label(&self) -> String {
        match &self.date {
            Some(date) => date.display(),
            None => crate::document::DATE_FALLBACK_LABEL.to_string(),
        }
    }
}

impl CollectionRecord for Event {
    const COLLECTION: &'static str = "events";

    fn from_document(doc: &RemoteDocument) -> Result<Self> {
        Ok(Self {
            id: Some(doc.id.clone()),
            title: required_str(doc, Self::COLLECTION, "title")?,
            description: optional_str(doc, "description"),
            date: optional_date(doc, "date"),
            time: optional_str(doc, "time"),
            location: optional_str(doc, "location"),
            attendees: string_list(doc, "attendees"),
            created_by: optional_str(doc, "createdBy"),
            created_at: optional_date(doc, "createdAt"),
        })
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::empty();
        fields.insert("title", Value::String(self.title.clone()));
        put_opt(&mut fields, "description", &self.description);
        put_date(&mut fields, "date", &self.date);
        put_opt(&mut fields, "time", &self.time);
        put_opt(&mut fields, "location", &self.location);
        if !self.attendees.is_empty() {
            fields.insert(
                "attendees",
                Value::Array(self.attendees.iter().cloned().map(Value::String).collect()),
            );
        }
        fields
    }
}
