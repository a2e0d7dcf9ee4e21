//! Remote document store trait.

use async_trait::async_trait;

use crate::document::{Fields, RemoteDocument};
use crate::query::QuerySpec;
use crate::types::{CollectionName, DocumentId};
use crate::{AccessToken, Result};

/// A document store addressed by collection and document id.
///
/// Field values equal to the server timestamp sentinel are replaced with the
/// store's commit time on every write.
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Evaluate a query and return a finite snapshot of matching documents.
    async fn run_query(
        &self,
        collection: &CollectionName,
        query: &QuerySpec,
        token: Option<&AccessToken>,
    ) -> Result<Vec<RemoteDocument>>;

    /// Fetch one document.
    async fn get_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        token: Option<&AccessToken>,
    ) -> Result<RemoteDocument>;

    /// Create a new document and return its id.
    ///
    /// A store-assigned id is used when `id` is `None`. Fails if the id is
    /// already taken.
    async fn create_document(
        &self,
        collection: &CollectionName,
        id: Option<&DocumentId>,
        fields: &Fields,
        token: Option<&AccessToken>,
    ) -> Result<DocumentId>;

    /// Update an existing document; `NotFound` if it does not exist.
    ///
    /// With `merge` only the given fields are overwritten, otherwise the
    /// document is replaced.
    async fn update_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()>;

    /// Write a document whether or not it exists.
    async fn set_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        token: Option<&AccessToken>,
    ) -> Result<()>;
}
