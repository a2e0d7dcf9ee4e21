//! fellowship-file - Filesystem-backed store implementations.
//!
//! - [`FileRemoteStore`]: a document store kept on disk that evaluates
//!   queries itself, for offline development and tests.
//! - [`FileKeyValueStore`]: the durable key-value store used for cached
//!   snapshots.
//! - [`FileAuthenticator`]: local accounts with bcrypt password hashes.

mod auth;
mod kv;
mod remote;
mod store;

pub use auth::FileAuthenticator;
pub use kv::FileKeyValueStore;
pub use remote::FileRemoteStore;
pub use store::{FileStore, LocalAccount};
