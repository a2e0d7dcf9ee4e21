//! Identity traits.

use async_trait::async_trait;

use crate::session::SessionCredential;
use crate::{Credentials, Result};

/// Source of the currently signed-in user.
pub trait IdentityProvider: Send + Sync {
    /// The current session, or `None` when signed out.
    fn current_user(&self) -> Option<SessionCredential>;
}

/// An identity service that exchanges credentials for a session.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Sign in with existing credentials.
    async fn sign_in(&self, credentials: Credentials) -> Result<SessionCredential>;

    /// Register a new account and sign it in.
    async fn sign_up(
        &self,
        credentials: Credentials,
        display_name: Option<&str>,
    ) -> Result<SessionCredential>;
}
