use serde_json::Value;

use crate::Result;
use crate::document::{DateField, Fields, RemoteDocument};
use crate::types::DocumentId;

use super::{CollectionRecord, optional_date, optional_str, put_opt, required_str, string_list};

/// A small group or ministry team.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Option<DocumentId>,
    pub name: String,
    pub description: Option<String>,
    pub leader: Option<String>,
    pub meeting_time: Option<String>,
    pub location: Option<String>,
    /// User ids of members.
    pub members: Vec<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateField>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            leader: None,
            meeting_time: None,
            location: None,
            members: Vec::new(),
            created_by: None,
            created_at: None,
        }
    }
}

impl CollectionRecord for Group {
    const COLLECTION: &'static str = "groups";

    fn from_document(doc: &RemoteDocument) -> Result<Self> {
        Ok(Self {
            id: Some(doc.id.clone()),
            name: required_str(doc, Self::COLLECTION, "name")?,
            description: optional_str(doc, "description"),
            leader: optional_str(doc, "leader"),
            meeting_time: optional_str(doc, "meetingTime"),
            location: optional_str(doc, "location"),
            members: string_list(doc, "members"),
            created_by: optional_str(doc, "createdBy"),
            created_at: optional_date(doc, "createdAt"),
        })
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::empty();
        fields.insert("name", Value::String(self.name.clone()));
        put_opt(&mut fields, "description", &self.description);
        put_opt(&mut fields, "leader", &self.leader);
        put_opt(&mut fields, "meetingTime", &self.meeting_time);
        put_opt(&mut fields, "location", &self.location);
        fields.insert(
            "members",
            Value::Array(self.members.iter().cloned().map(Value::String).collect()),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ignores_non_string_members() {
        let doc = RemoteDocument::new(
            DocumentId::new("g1").unwrap(),
            Fields::new(json!({
                "name": "Men's Breakfast",
                "members": ["uid-1", 7, null, "uid-2"],
                "meetingTime": "Saturdays 8am"
            }))
            .unwrap(),
        );
        let group = Group::from_document(&doc).unwrap();
        assert_eq!(group.members, vec!["uid-1", "uid-2"]);
        assert_eq!(group.meeting_time.as_deref(), Some("Saturdays 8am"));
    }
}
