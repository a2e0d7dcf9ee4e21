//! Error types for the fellowship data layer.
//!
//! Reads and writes fail differently: an unavailable store on the read path
//! can be masked with a cached snapshot, while every write failure reaches
//! the caller. The variants below keep those cases apart.

use std::fmt;
use thiserror::Error;

/// The unified error type for fellowship operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote store could not be reached (DNS, TLS, connection, timeout).
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(#[from] TransportError),

    /// No signed-in user is available for an operation that needs one.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authentication errors (invalid credentials, expired session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A write was rejected or could not be delivered.
    #[error("write to '{collection}' failed: {source}")]
    RemoteWrite {
        collection: String,
        source: Box<Error>,
    },

    /// The referenced document does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// Unexpected responses from the remote store.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (collection names, ids, fields, URLs).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Local persistence failures.
    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),

    /// The connector already holds a connection built from another config.
    #[error("connection already initialized with a different configuration")]
    AlreadyInitialized,

    /// The operation was abandoned through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Build a [`Error::NotFound`] for a collection/id pair.
    pub fn not_found(collection: impl fmt::Display, id: impl fmt::Display) -> Self {
        Error::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Returns true when the failure means the store could not be reached,
    /// as opposed to the store answering with a rejection.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::RemoteUnavailable(_) => true,
            Error::Protocol(e) => e.is_server_error(),
            _ => false,
        }
    }

    /// Returns true for errors that mean the caller must sign in again.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Unauthenticated | Error::Auth(_) => true,
            Error::Protocol(e) => e.is_auth_error(),
            _ => false,
        }
    }

    /// Wrap a failure on the write path.
    ///
    /// Conditions the caller acts on directly (missing document, missing
    /// session, bad input, cancellation) pass through unchanged.
    pub fn into_write_error(self, collection: impl fmt::Display) -> Self {
        match self {
            Error::NotFound { .. }
            | Error::Unauthenticated
            | Error::Auth(_)
            | Error::InvalidInput(_)
            | Error::Cancelled
            | Error::RemoteWrite { .. } => self,
            other => Error::RemoteWrite {
                collection: collection.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Session has expired.
    #[error("session expired")]
    SessionExpired,

    /// An account with this identifier already exists.
    #[error("account already exists: {identifier}")]
    AccountExists { identifier: String },
}

/// Protocol-level errors from store responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code reported by the store (if present).
    pub error: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || self.status == 403
            || self.error.as_deref() == Some("UNAUTHENTICATED")
            || self.error.as_deref() == Some("PERMISSION_DENIED")
    }

    /// Check if the server reported itself unavailable or overloaded.
    pub fn is_server_error(&self) -> bool {
        self.status >= 500 || self.status == 429
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid collection name.
    #[error("invalid collection name '{value}': {reason}")]
    CollectionName { value: String, reason: String },

    /// Invalid document id.
    #[error("invalid document id '{value}': {reason}")]
    DocumentId { value: String, reason: String },

    /// Invalid store URL.
    #[error("invalid store URL '{value}': {reason}")]
    StoreUrl { value: String, reason: String },

    /// Document fields are not a usable JSON object.
    #[error("invalid fields: {reason}")]
    Fields { reason: String },

    /// A stored document does not match its collection record shape.
    #[error("invalid document {collection}/{id}: {reason}")]
    Document {
        collection: String,
        id: String,
        reason: String,
    },

    /// Invalid query description.
    #[error("invalid query: {reason}")]
    Query { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Local persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored blob could not be decoded.
    #[error("corrupt entry '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// A value could not be encoded for storage.
    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(StorageError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_unavailable() {
        let err = Error::from(TransportError::Timeout);
        assert!(err.is_unavailable());
    }

    #[test]
    fn server_errors_are_unavailable_but_rejections_are_not() {
        let unavailable = Error::Protocol(ProtocolError::new(503, None, None));
        assert!(unavailable.is_unavailable());

        let rejected = Error::Protocol(ProtocolError::new(
            400,
            Some("INVALID_ARGUMENT".to_string()),
            None,
        ));
        assert!(!rejected.is_unavailable());
    }

    #[test]
    fn write_errors_keep_not_found() {
        let err = Error::not_found("events", "abc").into_write_error("events");
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn write_errors_wrap_transport_failures() {
        let err = Error::from(TransportError::Connection {
            message: "refused".to_string(),
        })
        .into_write_error("events");

        match err {
            Error::RemoteWrite { collection, source } => {
                assert_eq!(collection, "events");
                assert!(source.is_unavailable());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn protocol_error_display_includes_code_and_message() {
        let err = ProtocolError::new(
            404,
            Some("NOT_FOUND".to_string()),
            Some("no document".to_string()),
        );
        assert_eq!(err.to_string(), "HTTP 404 [NOT_FOUND]: no document");
    }
}
