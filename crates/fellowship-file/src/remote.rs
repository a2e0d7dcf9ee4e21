//! Filesystem-backed document store.

use std::path::Path;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use fellowship_core::document::{Fields, RemoteDocument, Timestamp};
use fellowship_core::error::{AuthError, Error, InvalidInputError, ProtocolError};
use fellowship_core::query::QuerySpec;
use fellowship_core::traits::RemoteStore;
use fellowship_core::types::{CollectionName, DocumentId};
use fellowship_core::{AccessToken, Result};

use crate::store::{FileStore, LocalAccount};

/// A document store kept on the local filesystem.
///
/// Reads are open; writes need a token issued by
/// [`FileAuthenticator`](crate::FileAuthenticator) for the same root,
/// matching the usual hosted rule set of "signed-in users may write".
#[derive(Debug, Clone)]
pub struct FileRemoteStore {
    store: FileStore,
}

impl FileRemoteStore {
    /// Create a new file-backed store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            store: FileStore::new(root),
        }
    }

    /// Access the underlying file store.
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub(crate) fn make_token(account: &LocalAccount) -> AccessToken {
        let token = json!({
            "uid": account.uid,
            "password_hash": account.password_hash,
        })
        .to_string();
        AccessToken::new(token)
    }

    pub(crate) fn parse_token(token: &AccessToken) -> Result<(String, String)> {
        let value: serde_json::Value = serde_json::from_str(token.as_str()).map_err(|e| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("Invalid token JSON: {}", e),
            })
        })?;

        let field = |name: &str| -> Result<String> {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::InvalidInput(InvalidInputError::Other {
                        message: format!("Token missing '{}'", name),
                    })
                })
        };

        Ok((field("uid")?, field("password_hash")?))
    }

    /// Resolve a token to its account, failing for stale or forged tokens.
    pub(crate) fn validate_token(&self, token: &AccessToken) -> Result<LocalAccount> {
        let (uid, password_hash) = Self::parse_token(token)?;
        let account = self
            .store
            .get_account(&uid)?
            .ok_or_else(|| AuthError::InvalidCredentials("Account not found".to_string()))?;

        if account.password_hash != password_hash {
            return Err(AuthError::InvalidCredentials("Invalid token".to_string()).into());
        }

        Ok(account)
    }

    fn ensure_write_access(&self, token: Option<&AccessToken>) -> Result<LocalAccount> {
        let token = token.ok_or(Error::Unauthenticated)?;
        self.validate_token(token)
    }
}

#[async_trait]
impl RemoteStore for FileRemoteStore {
    #[instrument(skip(self, _token), fields(%collection))]
    async fn run_query(
        &self,
        collection: &CollectionName,
        query: &QuerySpec,
        _token: Option<&AccessToken>,
    ) -> Result<Vec<RemoteDocument>> {
        query.validate()?;
        let documents = self.store.list_documents(collection)?;
        let result = query.apply(documents);
        debug!(count = result.len(), "Query evaluated");
        Ok(result)
    }

    #[instrument(skip(self, _token), fields(%collection, %id))]
    async fn get_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        _token: Option<&AccessToken>,
    ) -> Result<RemoteDocument> {
        self.store
            .read_document(collection, id)?
            .ok_or_else(|| Error::not_found(collection, id))
    }

    #[instrument(skip(self, fields, token), fields(%collection))]
    async fn create_document(
        &self,
        collection: &CollectionName,
        id: Option<&DocumentId>,
        fields: &Fields,
        token: Option<&AccessToken>,
    ) -> Result<DocumentId> {
        self.ensure_write_access(token)?;
        let _lock = self.store.lock()?;

        let id = id.cloned().unwrap_or_else(DocumentId::generate);

        if self.store.read_document(collection, &id)?.is_some() {
            return Err(ProtocolError::new(
                409,
                Some("ALREADY_EXISTS".to_string()),
                Some(format!("Document {}/{} already exists", collection, id)),
            )
            .into());
        }

        let mut fields = fields.clone();
        fields.resolve_server_timestamps(Timestamp::now());
        self.store.write_document(collection, &id, &fields)?;

        debug!(%id, "Created document");
        Ok(id)
    }

    #[instrument(skip(self, fields, token), fields(%collection, %id))]
    async fn update_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        self.ensure_write_access(token)?;
        let _lock = self.store.lock()?;

        let existing = self
            .store
            .read_document(collection, id)?
            .ok_or_else(|| Error::not_found(collection, id))?;

        write_merged(&self.store, collection, id, existing.fields, fields, merge)
    }

    #[instrument(skip(self, fields, token), fields(%collection, %id))]
    async fn set_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        self.ensure_write_access(token)?;
        let _lock = self.store.lock()?;

        let existing = self
            .store
            .read_document(collection, id)?
            .map(|doc| doc.fields)
            .unwrap_or_default();

        write_merged(&self.store, collection, id, existing, fields, merge)
    }

    #[instrument(skip(self, token), fields(%collection, %id))]
    async fn delete_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        self.ensure_write_access(token)?;
        let _lock = self.store.lock()?;
        self.store.remove_document(collection, id)?;
        Ok(())
    }
}

fn write_merged(
    store: &FileStore,
    collection: &CollectionName,
    id: &DocumentId,
    existing: Fields,
    fields: &Fields,
    merge: bool,
) -> Result<()> {
    let mut next = if merge { existing } else { Fields::empty() };
    next.merge(fields);
    next.resolve_server_timestamps(Timestamp::now());
    store.write_document(collection, id, &next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fellowship_core::query::Direction;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileRemoteStore, AccessToken) {
        let dir = TempDir::new().unwrap();
        let remote = FileRemoteStore::new(dir.path());
        let account = remote
            .store()
            .create_account("usher@example.org", None, "hash")
            .unwrap();
        let token = FileRemoteStore::make_token(&account);
        (dir, remote, token)
    }

    fn events() -> CollectionName {
        CollectionName::new("events").unwrap()
    }

    fn fields(value: serde_json::Value) -> Fields {
        Fields::new(value).unwrap()
    }

    #[tokio::test]
    async fn merge_update_leaves_other_fields() {
        let (_dir, remote, token) = setup();
        let id = remote
            .create_document(
                &events(),
                None,
                &fields(json!({ "title": "Bible Study", "location": "Room 2", "time": "7pm" })),
                Some(&token),
            )
            .await
            .unwrap();

        remote
            .update_document(&events(), &id, &fields(json!({ "location": "Room 5" })), true, Some(&token))
            .await
            .unwrap();

        let doc = remote.get_document(&events(), &id, None).await.unwrap();
        assert_eq!(doc.get("location"), Some(&json!("Room 5")));
        assert_eq!(doc.get("title"), Some(&json!("Bible Study")));
        assert_eq!(doc.get("time"), Some(&json!("7pm")));
    }

    #[tokio::test]
    async fn replace_update_drops_other_fields() {
        let (_dir, remote, token) = setup();
        let id = remote
            .create_document(&events(), None, &fields(json!({ "a": 1, "b": 2 })), Some(&token))
            .await
            .unwrap();

        remote
            .update_document(&events(), &id, &fields(json!({ "a": 3 })), false, Some(&token))
            .await
            .unwrap();

        let doc = remote.get_document(&events(), &id, None).await.unwrap();
        assert_eq!(doc.fields, fields(json!({ "a": 3 })));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let (_dir, remote, token) = setup();
        let err = remote
            .update_document(
                &events(),
                &DocumentId::new("ghost").unwrap(),
                &fields(json!({ "a": 1 })),
                true,
                Some(&token),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn set_document_creates_when_missing() {
        let (_dir, remote, token) = setup();
        let id = DocumentId::new("uid-1").unwrap();
        let users = CollectionName::new("users").unwrap();

        remote
            .set_document(
                &users,
                &id,
                &fields(json!({ "lastLogin": fellowship_core::document::server_timestamp() })),
                true,
                Some(&token),
            )
            .await
            .unwrap();

        let doc = remote.get_document(&users, &id, None).await.unwrap();
        assert!(Timestamp::from_value(doc.get("lastLogin").unwrap()).is_some());
    }

    #[tokio::test]
    async fn writes_require_a_valid_token() {
        let (_dir, remote, _token) = setup();

        let err = remote
            .create_document(&events(), None, &fields(json!({ "a": 1 })), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));

        let forged = AccessToken::new(json!({ "uid": "nobody", "password_hash": "x" }).to_string());
        let err = remote
            .create_document(&events(), None, &fields(json!({ "a": 1 })), Some(&forged))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));

        assert!(remote.run_query(&events(), &QuerySpec::new(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn long_ids_round_trip() {
        let (_dir, remote, token) = setup();
        let id = DocumentId::new(format!("announcement-{}", "x".repeat(190))).unwrap();

        remote
            .create_document(&events(), Some(&id), &fields(json!({ "title": "Harvest" })), Some(&token))
            .await
            .unwrap();
        remote
            .update_document(&events(), &id, &fields(json!({ "room": "Hall" })), true, Some(&token))
            .await
            .unwrap();

        let doc = remote.get_document(&events(), &id, None).await.unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.fields, fields(json!({ "title": "Harvest", "room": "Hall" })));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (_dir, remote, token) = setup();
        let id = DocumentId::new("fixed").unwrap();
        remote
            .create_document(&events(), Some(&id), &fields(json!({})), Some(&token))
            .await
            .unwrap();
        let err = remote
            .create_document(&events(), Some(&id), &fields(json!({})), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError { status: 409, .. })));
    }

    #[tokio::test]
    async fn query_orders_and_limits() {
        let (_dir, remote, token) = setup();
        for i in 0..25 {
            let date = Timestamp::new(1_700_000_000 + (i * 7919 % 25) * 3600, 0).unwrap();
            remote
                .create_document(
                    &events(),
                    None,
                    &fields(json!({ "title": format!("Event {i}"), "date": date.to_value() })),
                    Some(&token),
                )
                .await
                .unwrap();
        }

        let query = QuerySpec::new().order_by("date", Direction::Asc).limit(20);
        let docs = remote.run_query(&events(), &query, None).await.unwrap();

        assert_eq!(docs.len(), 20);
        for pair in docs.windows(2) {
            let a = Timestamp::from_value(pair[0].get("date").unwrap()).unwrap();
            let b = Timestamp::from_value(pair[1].get("date").unwrap()).unwrap();
            assert!(a <= b);
        }
    }
}
