//! Signed-in user state.

use serde::{Deserialize, Serialize};

use crate::tokens::{AccessToken, RefreshToken};

/// Minimal profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable user id issued by the identity service.
    pub id: String,
    /// Name shown to other members.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Sign-in email.
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session: opaque tokens plus the user's profile.
///
/// The accessor only reads this to attribute writes; it never mutates it.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub access_token: AccessToken,
    pub refresh_token: Option<RefreshToken>,
    pub profile: UserProfile,
}

impl SessionCredential {
    pub fn new(access_token: AccessToken, profile: UserProfile) -> Self {
        Self {
            access_token,
            refresh_token: None,
            profile,
        }
    }

    pub fn with_refresh_token(mut self, token: RefreshToken) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Returns the user id used for `createdBy` attribution.
    pub fn user_id(&self) -> &str {
        &self.profile.id
    }
}
