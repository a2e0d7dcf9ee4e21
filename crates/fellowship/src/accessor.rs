//! Typed read/write access to remote collections.
//!
//! Reads try the remote store first. When the store cannot be reached the
//! last successful result for the same query is served instead, marked with
//! [`Origin::Cache`]. Writes always go to the remote store and every failure
//! reaches the caller.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use fellowship_core::document::{Fields, RemoteDocument, server_timestamp};
use fellowship_core::error::Error;
use fellowship_core::query::QuerySpec;
use fellowship_core::records::CollectionRecord;
use fellowship_core::session::SessionCredential;
use fellowship_core::traits::{IdentityProvider, KeyValueStore};
use fellowship_core::types::{CollectionName, DocumentId};
use fellowship_core::Result;

use crate::cache::SnapshotCache;
use crate::connection::Connection;

/// Collection holding member profiles.
pub const USERS_COLLECTION: &str = "users";

/// A validated reference to one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionHandle {
    name: CollectionName,
}

impl CollectionHandle {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: CollectionName::new(name)?,
        })
    }

    pub fn name(&self) -> &CollectionName {
        &self.name
    }
}

impl fmt::Display for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}

/// Where the documents of a [`Snapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fresh from the remote store.
    Remote,
    /// The last cached result, served because the store was unreachable.
    Cache,
}

/// The documents returned by one read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<RemoteDocument>,
    pub origin: Origin,
}

impl Snapshot {
    pub fn is_cached(&self) -> bool {
        self.origin == Origin::Cache
    }
}

/// Typed records decoded from a [`Snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct Records<T> {
    pub records: Vec<T>,
    pub origin: Origin,
}

/// Reads and writes collections through one [`Connection`].
#[derive(Clone)]
pub struct Accessor {
    connection: Connection,
    cache: SnapshotCache,
    identity: Arc<dyn IdentityProvider>,
}

impl Accessor {
    pub fn new(
        connection: Connection,
        cache: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            connection,
            cache: SnapshotCache::new(cache),
            identity,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Validate a collection name. Performs no I/O.
    pub fn collection(&self, name: &str) -> Result<CollectionHandle> {
        CollectionHandle::new(name)
    }

    fn require_user(&self) -> Result<SessionCredential> {
        self.identity.current_user().ok_or(Error::Unauthenticated)
    }

    /// Run a query, falling back to the cached result when the store is
    /// unreachable.
    ///
    /// # Errors
    ///
    /// - the store's error when it is unreachable and nothing is cached
    /// - any other store error (auth, protocol, invalid query) unchanged
    pub async fn fetch(&self, handle: &CollectionHandle, query: &QuerySpec) -> Result<Snapshot> {
        self.fetch_cancellable(handle, query, &CancellationToken::new())
            .await
    }

    /// Like [`fetch`](Self::fetch), abandoning the request when `cancel`
    /// fires.
    ///
    /// A cancelled fetch returns [`Error::Cancelled`] and never writes the
    /// cache.
    #[instrument(skip(self, query, cancel), fields(collection = %handle, query = %query.cache_key()))]
    pub async fn fetch_cancellable(
        &self,
        handle: &CollectionHandle,
        query: &QuerySpec,
        cancel: &CancellationToken,
    ) -> Result<Snapshot> {
        let token = self.identity.current_user().map(|s| s.access_token);
        let request = self
            .connection
            .store()
            .run_query(handle.name(), query, token.as_ref());

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = request => result,
        };

        match result {
            Ok(documents) => {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                if let Err(e) = self.cache.replace(handle.name(), query, &documents).await {
                    warn!(error = %e, "Failed to cache snapshot");
                }
                debug!(count = documents.len(), "Fetched from remote store");
                Ok(Snapshot {
                    documents,
                    origin: Origin::Remote,
                })
            }
            Err(err) if err.is_unavailable() => self.fall_back(handle, query, err).await,
            Err(err) => Err(err),
        }
    }

    async fn fall_back(
        &self,
        handle: &CollectionHandle,
        query: &QuerySpec,
        err: Error,
    ) -> Result<Snapshot> {
        match self.cache.load(handle.name(), query).await {
            Ok(Some(snapshot)) => {
                warn!(
                    error = %err,
                    fetched_at = %snapshot.fetched_at,
                    "Remote store unavailable, serving cached snapshot"
                );
                Ok(Snapshot {
                    documents: snapshot.documents,
                    origin: Origin::Cache,
                })
            }
            Ok(None) => Err(err),
            Err(cache_err) => {
                warn!(error = %cache_err, "Cache unreadable");
                Err(err)
            }
        }
    }

    /// The cached documents for a query, without contacting the store.
    pub async fn cached(
        &self,
        handle: &CollectionHandle,
        query: &QuerySpec,
    ) -> Result<Option<Vec<RemoteDocument>>> {
        Ok(self
            .cache
            .load(handle.name(), query)
            .await?
            .map(|snapshot| snapshot.documents))
    }

    /// Fetch one document.
    #[instrument(skip(self), fields(collection = %handle))]
    pub async fn get(&self, handle: &CollectionHandle, id: &DocumentId) -> Result<RemoteDocument> {
        let token = self.identity.current_user().map(|s| s.access_token);
        self.connection
            .store()
            .get_document(handle.name(), id, token.as_ref())
            .await
    }

    /// Create a document attributed to the current user.
    ///
    /// `createdBy` is set to the user id and `createdAt` to the store's
    /// commit time, overriding any values in `fields`.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthenticated`] with nobody signed in; nothing is written
    /// - [`Error::RemoteWrite`] when the store rejects or never receives the
    ///   write
    #[instrument(skip(self, fields), fields(collection = %handle))]
    pub async fn create(&self, handle: &CollectionHandle, fields: &Fields) -> Result<DocumentId> {
        let session = self.require_user()?;

        let mut fields = fields.clone();
        fields.insert("createdBy", json!(session.user_id()));
        fields.insert("createdAt", server_timestamp());

        let id = self
            .connection
            .store()
            .create_document(handle.name(), None, &fields, Some(&session.access_token))
            .await
            .map_err(|e| e.into_write_error(handle))?;

        info!(%id, "Document created");
        Ok(id)
    }

    /// Update an existing document.
    ///
    /// With `merge` only the given fields change; without it the document
    /// is replaced by `fields`.
    #[instrument(skip(self, fields), fields(collection = %handle))]
    pub async fn update(
        &self,
        handle: &CollectionHandle,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
    ) -> Result<()> {
        let session = self.require_user()?;

        self.connection
            .store()
            .update_document(handle.name(), id, fields, merge, Some(&session.access_token))
            .await
            .map_err(|e| e.into_write_error(handle))?;

        info!("Document updated");
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %handle))]
    pub async fn delete(&self, handle: &CollectionHandle, id: &DocumentId) -> Result<()> {
        let session = self.require_user()?;

        self.connection
            .store()
            .delete_document(handle.name(), id, Some(&session.access_token))
            .await
            .map_err(|e| e.into_write_error(handle))?;

        info!("Document deleted");
        Ok(())
    }

    /// Stamp `lastLogin` on the current user's profile document, creating
    /// the document if needed.
    #[instrument(skip(self))]
    pub async fn record_login(&self) -> Result<()> {
        let session = self.require_user()?;
        let users = CollectionName::new(USERS_COLLECTION)?;
        let id = DocumentId::new(session.user_id())?;

        let mut fields = Fields::empty();
        fields.insert("lastLogin", server_timestamp());

        self.connection
            .store()
            .set_document(&users, &id, &fields, true, Some(&session.access_token))
            .await
            .map_err(|e| e.into_write_error(&users))
    }

    /// Fetch and normalize a whole typed collection.
    ///
    /// Documents that do not fit `T` are skipped with a warning.
    pub async fn fetch_records<T: CollectionRecord>(&self, query: &QuerySpec) -> Result<Records<T>> {
        let handle = CollectionHandle::new(T::COLLECTION)?;
        let snapshot = self.fetch(&handle, query).await?;

        let records = snapshot
            .documents
            .iter()
            .filter_map(|doc| match T::from_document(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(collection = T::COLLECTION, id = %doc.id, error = %e, "Skipping malformed document");
                    None
                }
            })
            .collect();

        Ok(Records {
            records,
            origin: snapshot.origin,
        })
    }

    /// Create a typed record.
    pub async fn create_record<T: CollectionRecord>(&self, record: &T) -> Result<DocumentId> {
        let handle = CollectionHandle::new(T::COLLECTION)?;
        self.create(&handle, &record.to_fields()).await
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
