//! Seam traits implemented by store, cache, and identity backends.

mod identity;
mod kv;
mod store;

pub use identity::{Authenticator, IdentityProvider};
pub use kv::KeyValueStore;
pub use store::RemoteStore;
