//! fellowship-rest - HTTP backends for the hosted document store and
//! identity service.
//!
//! - [`RestRemoteStore`]: documents over the REST interface (`runQuery`,
//!   `commit` with field masks, preconditions and server timestamps).
//! - [`RestAuthenticator`]: email/password accounts.

mod auth;
mod client;
mod store;
mod value;

pub use auth::RestAuthenticator;
pub use client::RestClient;
pub use store::RestRemoteStore;
