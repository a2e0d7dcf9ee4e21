//! fellowship-core - Core types and traits for the community data layer.
//!
//! This crate defines the vocabulary shared by every store backend and by the
//! accessor facade: validated collection names and document ids, schema-less
//! documents, query descriptions, timestamps, typed collection records, and
//! the seam traits a backend implements.

pub mod config;
pub mod credentials;
pub mod document;
pub mod error;
pub mod query;
pub mod records;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use config::{ConfigError, StoreConfig};
pub use credentials::Credentials;
pub use document::{DateField, Fields, RemoteDocument, Timestamp};
pub use error::Error;
pub use query::{Direction, Filter, Operator, OrderBy, QuerySpec};
pub use records::{Announcement, CollectionRecord, Event, Group, Member};
pub use session::{SessionCredential, UserProfile};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{Authenticator, IdentityProvider, KeyValueStore, RemoteStore};
pub use types::{CollectionName, DocumentId, StoreUrl};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
