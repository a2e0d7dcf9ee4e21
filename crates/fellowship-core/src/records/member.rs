use crate::Result;
use crate::document::{DateField, Fields, RemoteDocument};
use crate::types::DocumentId;

use super::{CollectionRecord, optional_date, optional_str, put_opt};

/// A member profile, keyed by the member's user id.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<DocumentId>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub last_login: Option<DateField>,
    pub created_at: Option<DateField>,
}

impl CollectionRecord for Member {
    const COLLECTION: &'static str = "users";

    fn from_document(doc: &RemoteDocument) -> Result<Self> {
        Ok(Self {
            id: Some(doc.id.clone()),
            display_name: optional_str(doc, "displayName").or_else(|| optional_str(doc, "name")),
            email: optional_str(doc, "email"),
            role: optional_str(doc, "role"),
            last_login: optional_date(doc, "lastLogin"),
            created_at: optional_date(doc, "createdAt"),
        })
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::empty();
        put_opt(&mut fields, "displayName", &self.display_name);
        put_opt(&mut fields, "email", &self.email);
        put_opt(&mut fields, "role", &self.role);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falls_back_to_name_field() {
        let doc = RemoteDocument::new(
            DocumentId::new("uid-1").unwrap(),
            Fields::new(json!({ "name": "Ruth", "lastLogin": "2024-05-01T09:00:00Z" })).unwrap(),
        );
        let member = Member::from_document(&doc).unwrap();
        assert_eq!(member.display_name.as_deref(), Some("Ruth"));
        assert!(matches!(member.last_login, Some(DateField::Timestamp(_))));
        assert!(!member.to_fields().contains_key("lastLogin"));
    }
}
