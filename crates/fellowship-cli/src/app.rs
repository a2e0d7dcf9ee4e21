//! Composition root: one connector, one accessor per invocation.

use std::sync::Arc;

use anyhow::{Context, Result};

use fellowship::{
    Accessor, Connector, IdentityProvider, SessionCredential, SessionHolder, StoreConfig,
};
use fellowship_file::FileKeyValueStore;

use crate::cli::StoreArgs;
use crate::session;

/// Everything a command needs to talk to the store.
pub struct App {
    pub config: StoreConfig,
    pub identity: Arc<SessionHolder>,
    pub accessor: Accessor,
}

impl App {
    /// Connect to the store and restore any saved session.
    pub async fn open(args: &StoreArgs) -> Result<Self> {
        let config = args.to_config()?;

        let connector = Connector::with_default_backends();
        let connection = connector
            .initialize(config.clone())
            .await
            .context("Failed to open document store")?;

        let identity = Arc::new(SessionHolder::new());
        if let Some(session) = session::load_session(&config).context("Failed to load session")? {
            identity.set(session);
        }

        let cache = Arc::new(FileKeyValueStore::scoped(
            session::cache_dir()?,
            &session::cache_scope(&config),
        ));
        let accessor = Accessor::new(connection, cache, identity.clone());

        Ok(Self {
            config,
            identity,
            accessor,
        })
    }

    /// The signed-in user, or an error telling the user to log in.
    pub fn require_session(&self) -> Result<SessionCredential> {
        self.identity
            .current_user()
            .context("No active session. Run 'fellowship login' first.")
    }
}
