//! Local accounts for the filesystem store.

use std::path::Path;

use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use tracing::{debug, instrument};

use fellowship_core::error::{AuthError, Error, InvalidInputError};
use fellowship_core::session::{SessionCredential, UserProfile};
use fellowship_core::traits::Authenticator;
use fellowship_core::{Credentials, Result};

use crate::remote::FileRemoteStore;
use crate::store::LocalAccount;

/// Signs users in against accounts kept next to a [`FileRemoteStore`].
///
/// Tokens it issues are accepted by a `FileRemoteStore` opened on the same
/// root.
#[derive(Debug, Clone)]
pub struct FileAuthenticator {
    remote: FileRemoteStore,
    cost: u32,
}

impl FileAuthenticator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            remote: FileRemoteStore::new(root),
            cost: DEFAULT_COST,
        }
    }

    /// Override the bcrypt cost used for new accounts.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    fn session_for(account: &LocalAccount) -> SessionCredential {
        let profile = UserProfile {
            id: account.uid.clone(),
            display_name: account.display_name.clone(),
            email: Some(account.email.clone()),
        };
        SessionCredential::new(FileRemoteStore::make_token(account), profile)
    }
}

fn bcrypt_error(err: bcrypt::BcryptError) -> Error {
    Error::InvalidInput(InvalidInputError::Other {
        message: err.to_string(),
    })
}

#[async_trait]
impl Authenticator for FileAuthenticator {
    #[instrument(skip(self, credentials), fields(identifier = credentials.identifier()))]
    async fn sign_in(&self, credentials: Credentials) -> Result<SessionCredential> {
        let account = self
            .remote
            .store()
            .find_account_by_email(credentials.identifier())?
            .ok_or_else(|| AuthError::InvalidCredentials("Account not found".to_string()))?;

        let ok = verify(credentials.password(), &account.password_hash).map_err(bcrypt_error)?;
        if !ok {
            return Err(AuthError::InvalidCredentials("Invalid password".to_string()).into());
        }

        debug!(uid = %account.uid, "Signed in");
        Ok(Self::session_for(&account))
    }

    #[instrument(skip(self, credentials), fields(identifier = credentials.identifier()))]
    async fn sign_up(
        &self,
        credentials: Credentials,
        display_name: Option<&str>,
    ) -> Result<SessionCredential> {
        let email = credentials.identifier();
        if !email.contains('@') {
            return Err(InvalidInputError::Other {
                message: format!("'{}' is not an email address", email),
            }
            .into());
        }
        if credentials.password().len() < 6 {
            return Err(InvalidInputError::Other {
                message: "Password must be at least 6 characters".to_string(),
            }
            .into());
        }

        let password_hash = hash(credentials.password(), self.cost).map_err(bcrypt_error)?;
        let account = self
            .remote
            .store()
            .create_account(email, display_name, &password_hash)?;

        debug!(uid = %account.uid, "Registered account");
        Ok(Self::session_for(&account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fellowship_core::document::Fields;
    use fellowship_core::traits::RemoteStore;
    use fellowship_core::types::CollectionName;
    use serde_json::json;
    use tempfile::TempDir;

    fn authenticator(dir: &TempDir) -> FileAuthenticator {
        FileAuthenticator::new(dir.path()).with_cost(4)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let dir = TempDir::new().unwrap();
        let auth = authenticator(&dir);

        let registered = auth
            .sign_up(Credentials::new("naomi@example.org", "hunter22"), Some("Naomi"))
            .await
            .unwrap();
        assert_eq!(registered.profile.display_name.as_deref(), Some("Naomi"));

        let session = auth
            .sign_in(Credentials::new("Naomi@Example.org", "hunter22"))
            .await
            .unwrap();
        assert_eq!(session.user_id(), registered.user_id());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let dir = TempDir::new().unwrap();
        let auth = authenticator(&dir);
        auth.sign_up(Credentials::new("boaz@example.org", "barley!"), None)
            .await
            .unwrap();

        let err = auth
            .sign_in(Credentials::new("boaz@example.org", "wheat!!"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(_))));

        let err = auth
            .sign_in(Credentials::new("nobody@example.org", "barley!"))
            .await
            .unwrap_err();
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn rejects_weak_registrations() {
        let dir = TempDir::new().unwrap();
        let auth = authenticator(&dir);

        assert!(auth.sign_up(Credentials::new("no-at-sign", "long enough"), None).await.is_err());
        assert!(auth.sign_up(Credentials::new("a@example.org", "short"), None).await.is_err());
    }

    #[tokio::test]
    async fn issued_token_authorizes_writes() {
        let dir = TempDir::new().unwrap();
        let auth = authenticator(&dir);
        let session = auth
            .sign_up(Credentials::new("lydia@example.org", "purple-cloth"), None)
            .await
            .unwrap();

        let remote = FileRemoteStore::new(dir.path());
        let groups = CollectionName::new("groups").unwrap();
        let id = remote
            .create_document(
                &groups,
                None,
                &Fields::new(json!({ "name": "Thyatira" })).unwrap(),
                Some(&session.access_token),
            )
            .await
            .unwrap();

        let doc = remote.get_document(&groups, &id, None).await.unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Thyatira")));
    }
}
