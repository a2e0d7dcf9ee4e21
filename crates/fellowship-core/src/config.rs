//! Store configuration.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::StoreUrl;

/// Hosted document store used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Hosted identity service used when no auth endpoint is configured.
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Static connection settings for a document store project.
///
/// Two configs are equal when every field matches; the connector relies on
/// this to recognise a repeated initialization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Web API key of the project.
    pub api_key: String,
    /// Project identifier.
    pub project_id: String,
    /// Bucket for uploaded media, if the project has one.
    #[serde(default)]
    pub storage_bucket: Option<String>,
    /// Document store base URL, or a `file://` URL for the local store.
    pub endpoint: StoreUrl,
    /// Identity service base URL; defaults to the hosted service.
    #[serde(default)]
    pub auth_endpoint: Option<StoreUrl>,
}

impl StoreConfig {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>, endpoint: StoreUrl) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            storage_bucket: None,
            endpoint,
            auth_endpoint: None,
        }
    }

    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    pub fn with_auth_endpoint(mut self, endpoint: StoreUrl) -> Self {
        self.auth_endpoint = Some(endpoint);
        self
    }

    /// Load configuration from `FELLOWSHIP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("FELLOWSHIP_API_KEY").ok_or(ConfigError::MissingVar("FELLOWSHIP_API_KEY"))?;
        let project_id =
            lookup("FELLOWSHIP_PROJECT_ID").ok_or(ConfigError::MissingVar("FELLOWSHIP_PROJECT_ID"))?;

        let endpoint = lookup("FELLOWSHIP_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = StoreUrl::new(&endpoint).map_err(|e| ConfigError::InvalidUrl {
            var: "FELLOWSHIP_ENDPOINT",
            reason: e.to_string(),
        })?;

        let auth_endpoint = lookup("FELLOWSHIP_AUTH_ENDPOINT")
            .map(|value| {
                StoreUrl::new(&value).map_err(|e| ConfigError::InvalidUrl {
                    var: "FELLOWSHIP_AUTH_ENDPOINT",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            api_key,
            project_id,
            storage_bucket: lookup("FELLOWSHIP_STORAGE_BUCKET"),
            endpoint,
            auth_endpoint,
        })
    }

    /// Returns the identity service URL, falling back to the hosted default.
    pub fn auth_endpoint_or_default(&self) -> StoreUrl {
        match &self.auth_endpoint {
            Some(url) => url.clone(),
            None => StoreUrl::new(DEFAULT_AUTH_ENDPOINT).expect("default auth endpoint is valid"),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("endpoint", &self.endpoint)
            .field("auth_endpoint", &self.auth_endpoint)
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),

    #[error("{var} is not a valid store URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },
}
