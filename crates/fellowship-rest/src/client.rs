//! JSON-over-HTTP client shared by the document store and identity service.

use std::fmt;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use url::Url;

use fellowship_core::error::{Error, InvalidInputError, ProtocolError, TransportError};
use fellowship_core::{AccessToken, Result, StoreUrl};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body returned by the hosted services.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::RemoteUnavailable(transport)
}

/// HTTP client for one service base URL.
///
/// Every request carries the project API key as the `key` query parameter,
/// and a bearer token when one is given.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: StoreUrl,
    api_key: String,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base", &self.base)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl RestClient {
    pub fn new(base: StoreUrl, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base: StoreUrl,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fellowship/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base,
            api_key: api_key.into(),
        })
    }

    pub fn base(&self) -> &StoreUrl {
        &self.base
    }

    /// Build a request URL from path segments, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.as_url().clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::InvalidInput(InvalidInputError::StoreUrl {
                    value: self.base.to_string(),
                    reason: "cannot be used as a base URL".to_string(),
                })
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    fn authorize(request: RequestBuilder, token: Option<&AccessToken>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    /// GET a JSON resource.
    #[instrument(skip(self, token), fields(base = %self.base))]
    pub async fn get<R>(&self, segments: &[&str], token: Option<&AccessToken>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(segments)?;
        debug!(path = url.path(), "GET");

        let response = Self::authorize(self.http.get(url), token)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(response).await
    }

    /// POST a JSON body and decode the JSON reply.
    #[instrument(skip(self, body, token), fields(base = %self.base))]
    pub async fn post<B, R>(
        &self,
        segments: &[&str],
        body: &B,
        token: Option<&AccessToken>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(segments)?;
        debug!(path = url.path(), "POST");

        let response = Self::authorize(self.http.post(url).json(body), token)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(response).await
    }

    async fn handle_response<R: DeserializeOwned>(&self, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        trace!(%status, "response");

        if status.is_success() {
            response.json::<R>().await.map_err(transport_error)
        } else {
            Err(Error::Protocol(Self::parse_error_response(response).await))
        }
    }

    async fn parse_error_response(response: reqwest::Response) -> ProtocolError {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(body) => ProtocolError::new(status, body.error.status, body.error.message),
            Err(_) => ProtocolError::new(status, None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_segments_and_appends_key() {
        let client = RestClient::new(StoreUrl::new("https://example.com/base/").unwrap(), "k1").unwrap();
        let url = client.url(&["v1", "docs", "a b"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/base/v1/docs/a%20b?key=k1");
    }

    #[test]
    fn url_keeps_colon_method_suffix() {
        let client = RestClient::new(StoreUrl::new("http://localhost:8080").unwrap(), "k").unwrap();
        let url = client.url(&["v1", "projects", "p", "documents:runQuery"]).unwrap();
        assert_eq!(url.path(), "/v1/projects/p/documents:runQuery");
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = RestClient::new(StoreUrl::new("http://localhost:8080").unwrap(), "secret").unwrap();
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
