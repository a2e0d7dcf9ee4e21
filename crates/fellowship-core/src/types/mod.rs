//! Validated identifier types.
//!
//! These types enforce store naming rules at construction time,
//! so an invalid collection or document path cannot be addressed.

mod collection;
mod document_id;
mod store_url;

pub use collection::CollectionName;
pub use document_id::DocumentId;
pub use store_url::StoreUrl;
