//! Backend selection.
//!
//! The endpoint's scheme picks the implementation:
//!
//! - `file://` URLs open a [`FileRemoteStore`] / [`FileAuthenticator`] on
//!   that directory
//! - `http://` and `https://` URLs use the REST backends

use std::sync::Arc;

use tracing::debug;

use fellowship_core::error::{Error, InvalidInputError};
use fellowship_core::traits::{Authenticator, RemoteStore};
use fellowship_core::{Result, StoreConfig, StoreUrl};
use fellowship_file::{FileAuthenticator, FileRemoteStore};
use fellowship_rest::{RestAuthenticator, RestRemoteStore};

fn local_root(url: &StoreUrl) -> Result<std::path::PathBuf> {
    url.to_file_path().ok_or_else(|| {
        Error::InvalidInput(InvalidInputError::StoreUrl {
            value: url.to_string(),
            reason: "not a usable file path".to_string(),
        })
    })
}

/// Open the document store named by `config.endpoint`.
///
/// This is the default factory of [`Connector`](crate::Connector).
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn RemoteStore>> {
    if config.endpoint.is_local() {
        let root = local_root(&config.endpoint)?;
        debug!(root = %root.display(), "Opening file store");
        Ok(Arc::new(FileRemoteStore::new(root)))
    } else {
        debug!(endpoint = %config.endpoint, project = %config.project_id, "Opening REST store");
        Ok(Arc::new(RestRemoteStore::new(config)?))
    }
}

/// Open the identity service matching `config`.
///
/// A `file://` store keeps its accounts next to its documents, so the
/// identity endpoint is ignored in that case.
pub fn open_authenticator(config: &StoreConfig) -> Result<Arc<dyn Authenticator>> {
    if config.endpoint.is_local() {
        Ok(Arc::new(FileAuthenticator::new(local_root(&config.endpoint)?)))
    } else {
        Ok(Arc::new(RestAuthenticator::new(config)?))
    }
}
