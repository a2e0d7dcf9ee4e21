//! Filesystem layout for the local document store.
//!
//! ```text
//! <root>/
//!   store.lock
//!   documents/<collection>/<sha256(id)>.json
//!   accounts/<uid>/account.json
//! ```
//!
//! Document files are named by a digest of the id so any valid id fits in
//! a file name; the id itself is stored inside the file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use fellowship_core::Result;
use fellowship_core::document::{Fields, RemoteDocument};
use fellowship_core::error::{AuthError, Error, StorageError};
use fellowship_core::types::{CollectionName, DocumentId};

fn serialization_error(err: serde_json::Error) -> Error {
    Error::Storage(StorageError::Serialization {
        message: err.to_string(),
    })
}

/// On-disk form of a document.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    id: DocumentId,
    fields: Fields,
}

/// Account metadata stored in the local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAccount {
    /// Stable user id.
    pub uid: String,
    /// Sign-in email.
    pub email: String,
    /// Name shown to other members.
    #[serde(default)]
    pub display_name: Option<String>,
    /// When the account was created.
    pub created_at: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
}

/// Filesystem storage for documents and local accounts.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// Held for the duration of a write; the lock is released on drop.
pub(crate) struct WriteLock(File);

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.0) {
            warn!(error = %e, "Failed to release store lock");
        }
    }
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn documents_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.root.join("accounts")
    }

    fn collection_dir(&self, collection: &CollectionName) -> PathBuf {
        self.documents_dir().join(collection.as_str())
    }

    fn document_path(&self, collection: &CollectionName, id: &DocumentId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", digest_name(id.as_str())))
    }

    fn account_path(&self, uid: &str) -> PathBuf {
        self.accounts_dir().join(uid).join("account.json")
    }

    /// Take the store-wide advisory write lock.
    pub(crate) fn lock(&self) -> Result<WriteLock> {
        fs::create_dir_all(&self.root)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.root.join("store.lock"))?;
        lock_file.lock_exclusive()?;
        Ok(WriteLock(lock_file))
    }

    /// Write a file atomically via a sibling temp file.
    fn write_atomic(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    // ========================================================================
    // Documents
    // ========================================================================

    pub fn read_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
    ) -> Result<Option<RemoteDocument>> {
        let path = self.document_path(collection, id);

        if !path.exists() {
            return Ok(None);
        }

        let stored = Self::read_stored(collection, &path)?;
        if stored.id != *id {
            warn!(%collection, %id, stored = %stored.id, "Document file holds another id");
            return Ok(None);
        }

        Ok(Some(RemoteDocument::new(stored.id, stored.fields)))
    }

    fn read_stored(collection: &CollectionName, path: &Path) -> Result<StoredDocument> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Storage(StorageError::Corrupt {
                key: format!("{}/{}", collection, path.display()),
                reason: e.to_string(),
            })
        })
    }

    /// Every readable document in a collection, in no particular order.
    #[instrument(skip(self))]
    pub fn list_documents(&self, collection: &CollectionName) -> Result<Vec<RemoteDocument>> {
        let dir = self.collection_dir(collection);

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            match Self::read_stored(collection, &path) {
                Ok(stored) => documents.push(RemoteDocument::new(stored.id, stored.fields)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }

        Ok(documents)
    }

    pub fn write_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
    ) -> Result<()> {
        let stored = StoredDocument {
            id: id.clone(),
            fields: fields.clone(),
        };
        let content = serde_json::to_string_pretty(&stored).map_err(serialization_error)?;
        Self::write_atomic(&self.document_path(collection, id), &content)?;
        debug!(%collection, %id, "Wrote document");
        Ok(())
    }

    /// Remove a document, returning whether it existed.
    pub fn remove_document(&self, collection: &CollectionName, id: &DocumentId) -> Result<bool> {
        let path = self.document_path(collection, id);

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)?;
        debug!(%collection, %id, "Removed document");
        Ok(true)
    }

    // ========================================================================
    // Account Management
    // ========================================================================

    #[instrument(skip(self, password_hash))]
    pub fn create_account(
        &self,
        email: &str,
        display_name: Option<&str>,
        password_hash: &str,
    ) -> Result<LocalAccount> {
        let _lock = self.lock()?;

        if self.find_account_by_email(email)?.is_some() {
            return Err(AuthError::AccountExists {
                identifier: email.to_string(),
            }
            .into());
        }

        let uid = Uuid::new_v4().simple().to_string()[..28].to_string();

        let account = LocalAccount {
            uid: uid.clone(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            created_at: Utc::now().to_rfc3339(),
            password_hash: password_hash.to_string(),
        };

        let content = serde_json::to_string_pretty(&account).map_err(serialization_error)?;
        Self::write_atomic(&self.account_path(&uid), &content)?;

        debug!(uid = %uid, "Created local account");

        Ok(account)
    }

    pub fn get_account(&self, uid: &str) -> Result<Option<LocalAccount>> {
        // uids are generated locally; reject anything that could escape the
        // accounts directory.
        if uid.is_empty() || !uid.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(None);
        }

        let account_path = self.account_path(uid);

        if !account_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&account_path)?;
        let account: LocalAccount = serde_json::from_str(&content).map_err(|e| {
            Error::Storage(StorageError::Corrupt {
                key: format!("account {}", uid),
                reason: e.to_string(),
            })
        })?;

        Ok(Some(account))
    }

    pub fn list_accounts(&self) -> Result<Vec<LocalAccount>> {
        let accounts_dir = self.accounts_dir();

        if !accounts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut accounts = Vec::new();

        for entry in fs::read_dir(&accounts_dir)? {
            let account_file = entry?.path().join("account.json");

            if account_file.exists() {
                let content = fs::read_to_string(&account_file)?;
                if let Ok(account) = serde_json::from_str::<LocalAccount>(&content) {
                    accounts.push(account);
                }
            }
        }

        Ok(accounts)
    }

    pub fn find_account_by_email(&self, email: &str) -> Result<Option<LocalAccount>> {
        let accounts = self.list_accounts()?;
        Ok(accounts
            .into_iter()
            .find(|a| a.email.eq_ignore_ascii_case(email)))
    }
}

/// Fixed-length, filesystem-safe name for an arbitrary string.
pub(crate) fn digest_name(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn events() -> CollectionName {
        CollectionName::new("events").unwrap()
    }

    #[test]
    fn digest_names_have_fixed_length() {
        assert_eq!(digest_name("a").len(), 64);
        assert_eq!(digest_name(&"x".repeat(1500)).len(), 64);
        assert_ne!(digest_name("sunday service: 10:30"), digest_name("sunday service"));
    }

    #[test]
    fn long_ids_are_written_and_read_back() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let id = DocumentId::new("r".repeat(200)).unwrap();
        let fields = Fields::new(json!({ "title": "Revival week" })).unwrap();

        store.write_document(&events(), &id, &fields).unwrap();

        let doc = store.read_document(&events(), &id).unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.fields, fields);

        let docs = store.list_documents(&events()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
    }

    #[test]
    fn document_with_mismatched_id_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let id = DocumentId::new("potluck").unwrap();
        let other = DocumentId::new("picnic").unwrap();
        let fields = Fields::new(json!({ "title": "Picnic" })).unwrap();
        store.write_document(&events(), &other, &fields).unwrap();

        fs::copy(
            store.document_path(&events(), &other),
            store.document_path(&events(), &id),
        )
        .unwrap();

        assert!(store.read_document(&events(), &id).unwrap().is_none());
    }

    #[test]
    fn documents_are_written_and_listed() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let id = DocumentId::new("potluck").unwrap();
        let fields = Fields::new(json!({ "title": "Potluck" })).unwrap();

        store.write_document(&events(), &id, &fields).unwrap();

        let docs = store.list_documents(&events()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].fields, fields);

        assert!(store.remove_document(&events(), &id).unwrap());
        assert!(!store.remove_document(&events(), &id).unwrap());
        assert!(store.list_documents(&events()).unwrap().is_empty());
    }

    #[test]
    fn corrupt_documents_are_skipped_when_listing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let good = DocumentId::new("good").unwrap();
        store
            .write_document(&events(), &good, &Fields::new(json!({ "title": "ok" })).unwrap())
            .unwrap();

        let bad_path = dir
            .path()
            .join("documents/events")
            .join(format!("{}.json", digest_name("bad")));
        fs::write(&bad_path, "[not an object]").unwrap();

        let docs = store.list_documents(&events()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, good);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let account = store.create_account("ruth@example.org", Some("Ruth"), "hash").unwrap();
        assert_eq!(
            store.get_account(&account.uid).unwrap().unwrap().email,
            "ruth@example.org"
        );

        let err = store.create_account("RUTH@example.org", None, "hash").unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountExists { .. })));
    }

    #[test]
    fn get_account_rejects_path_like_uids() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get_account("../etc").unwrap().is_none());
    }
}
