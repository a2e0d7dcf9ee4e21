//! Shared fixtures for the accessor and refresh tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use fellowship::{
    AccessToken, Accessor, CollectionName, Connection, DocumentId, Fields, MemoryKeyValueStore,
    QuerySpec, RemoteDocument, Result, SessionCredential, SessionHolder, StoreConfig, StoreUrl,
    Timestamp, UserProfile,
};
use fellowship_core::error::{Error, ProtocolError, TransportError};
use fellowship_core::traits::RemoteStore;

type Key = (String, String);

/// An in-memory remote store that can be taken offline, made to reject
/// reads, or slowed down.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<Key, Fields>>,
    offline: AtomicBool,
    reject_reads: AtomicBool,
    delay_ms: AtomicUsize,
    queries: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_reject_reads(&self, reject: bool) {
        self.reject_reads.store(reject, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn insert(&self, collection: &str, id: &str, value: Value) {
        self.docs.lock().unwrap().insert(
            (collection.to_string(), id.to_string()),
            Fields::new(value).unwrap(),
        );
    }

    pub fn read(&self, collection: &str, id: &str) -> Option<Fields> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    fn unavailable() -> Error {
        TransportError::Connection {
            message: "network is unreachable".to_string(),
        }
        .into()
    }

    async fn pause(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        }
    }

    fn check_write(&self, token: Option<&AccessToken>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if token.is_none() {
            return Err(Error::Unauthenticated);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    fn key(collection: &CollectionName, id: &DocumentId) -> Key {
        (collection.to_string(), id.to_string())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn run_query(
        &self,
        collection: &CollectionName,
        query: &QuerySpec,
        _token: Option<&AccessToken>,
    ) -> Result<Vec<RemoteDocument>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        if self.reject_reads.load(Ordering::SeqCst) {
            return Err(ProtocolError::new(
                403,
                Some("PERMISSION_DENIED".to_string()),
                Some("Missing or insufficient permissions.".to_string()),
            )
            .into());
        }

        let docs: Vec<RemoteDocument> = self
            .docs
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, _), _)| c == collection.as_str())
            .map(|((_, id), fields)| {
                RemoteDocument::new(DocumentId::new(id.clone()).unwrap(), fields.clone())
            })
            .collect();
        Ok(query.apply(docs))
    }

    async fn get_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        _token: Option<&AccessToken>,
    ) -> Result<RemoteDocument> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.docs
            .lock()
            .unwrap()
            .get(&Self::key(collection, id))
            .map(|fields| RemoteDocument::new(id.clone(), fields.clone()))
            .ok_or_else(|| Error::not_found(collection, id))
    }

    async fn create_document(
        &self,
        collection: &CollectionName,
        id: Option<&DocumentId>,
        fields: &Fields,
        token: Option<&AccessToken>,
    ) -> Result<DocumentId> {
        self.check_write(token)?;
        let id = id.cloned().unwrap_or_else(DocumentId::generate);
        let mut fields = fields.clone();
        fields.resolve_server_timestamps(Timestamp::now());
        self.docs
            .lock()
            .unwrap()
            .insert(Self::key(collection, &id), fields);
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        self.check_write(token)?;
        let mut docs = self.docs.lock().unwrap();
        let existing = docs
            .get_mut(&Self::key(collection, id))
            .ok_or_else(|| Error::not_found(collection, id))?;
        if !merge {
            *existing = Fields::empty();
        }
        existing.merge(fields);
        existing.resolve_server_timestamps(Timestamp::now());
        Ok(())
    }

    async fn set_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        self.check_write(token)?;
        let mut docs = self.docs.lock().unwrap();
        let existing = docs.entry(Self::key(collection, id)).or_default();
        if !merge {
            *existing = Fields::empty();
        }
        existing.merge(fields);
        existing.resolve_server_timestamps(Timestamp::now());
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        self.check_write(token)?;
        self.docs.lock().unwrap().remove(&Self::key(collection, id));
        Ok(())
    }
}

pub fn config() -> StoreConfig {
    StoreConfig::new("key", "test", StoreUrl::new("https://firestore.googleapis.com").unwrap())
}

pub fn session(uid: &str) -> SessionCredential {
    SessionCredential::new(
        AccessToken::new(format!("token-{uid}")),
        UserProfile {
            id: uid.to_string(),
            display_name: Some("Test Member".to_string()),
            email: Some(format!("{uid}@example.org")),
        },
    )
}

/// An accessor over `store` with an in-memory cache.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryKeyValueStore>,
    pub identity: Arc<SessionHolder>,
    pub accessor: Accessor,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let cache = Arc::new(MemoryKeyValueStore::new());
        let identity = Arc::new(SessionHolder::new());
        let connection = Connection::new(config(), store.clone());
        let accessor = Accessor::new(connection, cache.clone(), identity.clone());
        Self {
            store,
            cache,
            identity,
            accessor,
        }
    }

    pub fn signed_in(uid: &str) -> Self {
        let fixture = Self::new();
        fixture.identity.set(session(uid));
        fixture
    }
}

pub fn ts(seconds: i64) -> Value {
    serde_json::json!({ "seconds": seconds, "nanoseconds": 0 })
}
