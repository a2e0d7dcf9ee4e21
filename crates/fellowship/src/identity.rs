//! Holder for the signed-in session.

use std::sync::RwLock;

use tracing::debug;

use fellowship_core::session::SessionCredential;
use fellowship_core::traits::IdentityProvider;

/// An [`IdentityProvider`] whose session is set by the application after
/// sign-in and cleared on sign-out.
#[derive(Debug, Default)]
pub struct SessionHolder {
    session: RwLock<Option<SessionCredential>>,
}

impl SessionHolder {
    /// A holder with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(session: SessionCredential) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    pub fn set(&self, session: SessionCredential) {
        debug!(uid = %session.user_id(), "Session set");
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
    }

    /// Forget the session, returning it if there was one.
    pub fn clear(&self) -> Option<SessionCredential> {
        self.session.write().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl IdentityProvider for SessionHolder {
    fn current_user(&self) -> Option<SessionCredential> {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
