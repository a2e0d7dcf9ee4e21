//! Last-known-good query results kept in a [`KeyValueStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use fellowship_core::document::RemoteDocument;
use fellowship_core::error::{Error, StorageError};
use fellowship_core::query::QuerySpec;
use fellowship_core::traits::KeyValueStore;
use fellowship_core::types::CollectionName;
use fellowship_core::Result;

/// The stored result of one successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSnapshot {
    pub collection: CollectionName,
    pub query_key: String,
    pub fetched_at: DateTime<Utc>,
    pub documents: Vec<RemoteDocument>,
}

/// Cache key for a collection/query pair.
pub fn snapshot_key(collection: &CollectionName, query: &QuerySpec) -> String {
    format!("snapshot/{}/{}", collection, query.cache_key())
}

/// Reads and replaces [`CachedSnapshot`]s.
///
/// A snapshot is only ever written whole; there is no expiry.
#[derive(Clone)]
pub struct SnapshotCache {
    kv: Arc<dyn KeyValueStore>,
}

impl SnapshotCache {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Load the snapshot for a query.
    ///
    /// An entry that no longer decodes is treated as absent.
    #[instrument(skip(self, query), fields(%collection))]
    pub async fn load(
        &self,
        collection: &CollectionName,
        query: &QuerySpec,
    ) -> Result<Option<CachedSnapshot>> {
        let key = snapshot_key(collection, query);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<CachedSnapshot>(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(%key, error = %e, "Ignoring undecodable snapshot");
                Ok(None)
            }
        }
    }

    /// Replace the snapshot for a query.
    #[instrument(skip(self, query, documents), fields(%collection, count = documents.len()))]
    pub async fn replace(
        &self,
        collection: &CollectionName,
        query: &QuerySpec,
        documents: &[RemoteDocument],
    ) -> Result<()> {
        let snapshot = CachedSnapshot {
            collection: collection.clone(),
            query_key: query.cache_key(),
            fetched_at: Utc::now(),
            documents: documents.to_vec(),
        };
        let raw = serde_json::to_string(&snapshot).map_err(|e| {
            Error::Storage(StorageError::Serialization {
                message: e.to_string(),
            })
        })?;

        self.kv.set(&snapshot_key(collection, query), raw).await?;
        debug!("Snapshot replaced");
        Ok(())
    }

    /// Drop every snapshot, along with anything else in the store.
    pub async fn clear(&self) -> Result<()> {
        self.kv.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKeyValueStore;
    use fellowship_core::document::Fields;
    use fellowship_core::query::Direction;
    use fellowship_core::types::DocumentId;
    use serde_json::json;

    fn doc(id: &str, title: &str) -> RemoteDocument {
        RemoteDocument::new(
            DocumentId::new(id).unwrap(),
            Fields::new(json!({ "title": title })).unwrap(),
        )
    }

    fn events() -> CollectionName {
        CollectionName::new("events").unwrap()
    }

    #[tokio::test]
    async fn replace_then_load() {
        let cache = SnapshotCache::new(Arc::new(MemoryKeyValueStore::new()));
        let query = QuerySpec::new().order_by("date", Direction::Asc);

        assert!(cache.load(&events(), &query).await.unwrap().is_none());

        cache.replace(&events(), &query, &[doc("a", "Old")]).await.unwrap();
        cache
            .replace(&events(), &query, &[doc("b", "New"), doc("c", "Newer")])
            .await
            .unwrap();

        let snapshot = cache.load(&events(), &query).await.unwrap().unwrap();
        assert_eq!(snapshot.documents, vec![doc("b", "New"), doc("c", "Newer")]);
        assert_eq!(snapshot.query_key, query.cache_key());
    }

    #[tokio::test]
    async fn distinct_queries_use_distinct_keys() {
        let cache = SnapshotCache::new(Arc::new(MemoryKeyValueStore::new()));
        let all = QuerySpec::new();
        let limited = QuerySpec::new().limit(5);

        cache.replace(&events(), &all, &[doc("a", "All")]).await.unwrap();

        assert!(cache.load(&events(), &limited).await.unwrap().is_none());
        assert_ne!(snapshot_key(&events(), &all), snapshot_key(&events(), &limited));
    }

    #[tokio::test]
    async fn corrupt_entries_read_as_absent() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let query = QuerySpec::new();
        kv.set(&snapshot_key(&events(), &query), "{oops".to_string())
            .await
            .unwrap();

        let cache = SnapshotCache::new(kv);
        assert!(cache.load(&events(), &query).await.unwrap().is_none());
    }
}
