//! Documents and the values stored in them.
//!
//! Documents are schema-less at this level. Typed views live in
//! [`records`](crate::records) and are built from these types.

mod fields;
mod remote;
mod timestamp;

pub use fields::Fields;
pub use remote::RemoteDocument;
pub use timestamp::{
    DATE_FALLBACK_LABEL, DateField, Timestamp, display_date, is_server_timestamp,
    server_timestamp,
};
