//! fellowship - Remote collection accessor for community apps.
//!
//! This crate gives a presentation layer typed access to the collections of
//! a hosted document store (events, announcements, groups, members), with a
//! local snapshot cache that keeps list views populated while offline and a
//! cancellable polling policy for keeping them fresh.
//!
//! The composition root owns a [`Connector`]; everything else receives the
//! [`Connection`] or [`Accessor`] it needs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fellowship::{
//!     Accessor, Connector, Direction, MemoryKeyValueStore, QuerySpec, SessionHolder, StoreConfig,
//! };
//!
//! # async fn example() -> Result<(), fellowship::Error> {
//! let connector = Connector::with_default_backends();
//! let connection = connector.initialize(StoreConfig::from_env().unwrap()).await?;
//!
//! let accessor = Accessor::new(
//!     connection,
//!     Arc::new(MemoryKeyValueStore::new()),
//!     Arc::new(SessionHolder::new()),
//! );
//!
//! let events = accessor.collection("events")?;
//! let upcoming = QuerySpec::new().order_by("date", Direction::Asc).limit(20);
//! let snapshot = accessor.fetch(&events, &upcoming).await?;
//!
//! for doc in &snapshot.documents {
//!     println!("{}: {}", doc.id, doc.display_date("date"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod backend;
pub mod cache;
pub mod connection;
pub mod identity;
pub mod memory;
pub mod refresh;

pub use accessor::{Accessor, CollectionHandle, Origin, Records, Snapshot};
pub use cache::{CachedSnapshot, SnapshotCache};
pub use connection::{Connection, Connector, ConnectorState, StoreFactory};
pub use identity::SessionHolder;
pub use memory::MemoryKeyValueStore;
pub use refresh::{ListRefresher, ListState, ListSubscription, SortPolicy};

// Re-export the shared vocabulary so most users need only this crate.
pub use fellowship_core::document::{DATE_FALLBACK_LABEL, display_date, server_timestamp};
pub use fellowship_core::{
    AccessToken, Announcement, CollectionName, CollectionRecord, Credentials, DateField, Direction,
    DocumentId, Error, Event, Fields, Group, Member, Operator, QuerySpec, RefreshToken,
    RemoteDocument, Result, SessionCredential, StoreConfig, StoreUrl, Timestamp, UserProfile,
};
pub use fellowship_core::traits::{Authenticator, IdentityProvider, KeyValueStore, RemoteStore};
