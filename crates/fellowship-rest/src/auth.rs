//! Email/password sign-in against the hosted identity service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use fellowship_core::error::{AuthError, Error, InvalidInputError};
use fellowship_core::session::{SessionCredential, UserProfile};
use fellowship_core::traits::Authenticator;
use fellowship_core::{AccessToken, Credentials, RefreshToken, Result, StoreConfig};

use crate::client::RestClient;

const SIGN_IN: &str = "accounts:signInWithPassword";
const SIGN_UP: &str = "accounts:signUp";
const UPDATE: &str = "accounts:update";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl AuthResponse {
    fn into_session(self) -> SessionCredential {
        let profile = UserProfile {
            id: self.local_id,
            display_name: self.display_name.filter(|name| !name.is_empty()),
            email: self.email,
        };
        let session = SessionCredential::new(AccessToken::new(self.id_token), profile);
        match self.refresh_token {
            Some(token) => session.with_refresh_token(RefreshToken::new(token)),
            None => session,
        }
    }
}

/// Translate identity service error codes into auth errors.
///
/// The service reports its reason in the message (`EMAIL_EXISTS`,
/// `WEAK_PASSWORD : Password should be at least 6 characters`).
fn map_auth_error(err: Error, email: &str) -> Error {
    let protocol = match err {
        Error::Protocol(protocol) => protocol,
        other => return other,
    };

    let code = protocol
        .message
        .as_deref()
        .and_then(|m| m.split(':').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    match code.as_str() {
        "EMAIL_EXISTS" => AuthError::AccountExists {
            identifier: email.to_string(),
        }
        .into(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials(code.clone()).into()
        }
        "INVALID_EMAIL" | "WEAK_PASSWORD" | "MISSING_PASSWORD" => {
            InvalidInputError::Other {
                message: protocol.message.clone().unwrap_or_else(|| code.clone()),
            }
            .into()
        }
        _ => Error::Protocol(protocol),
    }
}

/// Authenticator for the hosted identity service.
#[derive(Debug, Clone)]
pub struct RestAuthenticator {
    client: RestClient,
}

impl RestAuthenticator {
    /// Create an authenticator for the identity endpoint in `config`.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = RestClient::new(config.auth_endpoint_or_default(), config.api_key.clone())?;
        Ok(Self { client })
    }

    async fn password_request(&self, method: &str, credentials: &Credentials) -> Result<AuthResponse> {
        let request = PasswordRequest {
            email: credentials.identifier(),
            password: credentials.password(),
            return_secure_token: true,
        };
        self.client
            .post(&["v1", method], &request, None)
            .await
            .map_err(|e| map_auth_error(e, credentials.identifier()))
    }
}

#[async_trait]
impl Authenticator for RestAuthenticator {
    #[instrument(skip(self, credentials), fields(identifier = credentials.identifier()))]
    async fn sign_in(&self, credentials: Credentials) -> Result<SessionCredential> {
        let response = self.password_request(SIGN_IN, &credentials).await?;
        debug!(uid = %response.local_id, "Signed in");
        Ok(response.into_session())
    }

    #[instrument(skip(self, credentials), fields(identifier = credentials.identifier()))]
    async fn sign_up(
        &self,
        credentials: Credentials,
        display_name: Option<&str>,
    ) -> Result<SessionCredential> {
        let mut response = self.password_request(SIGN_UP, &credentials).await?;
        debug!(uid = %response.local_id, "Registered account");

        if let Some(name) = display_name {
            let request = UpdateProfileRequest {
                id_token: &response.id_token,
                display_name: name,
                return_secure_token: false,
            };
            let _: serde_json::Value = self.client.post(&["v1", UPDATE], &request, None).await?;
            response.display_name = Some(name.to_string());
        }

        Ok(response.into_session())
    }
}
