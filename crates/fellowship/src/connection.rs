//! Idempotent connection setup.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use fellowship_core::error::Error;
use fellowship_core::traits::RemoteStore;
use fellowship_core::{Result, StoreConfig};

/// Builds a store client from a configuration.
pub type StoreFactory = Arc<dyn Fn(&StoreConfig) -> Result<Arc<dyn RemoteStore>> + Send + Sync>;

/// Lifecycle of a [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Uninitialized,
    Initializing,
    Ready,
}

/// A shared handle to an initialized store client.
///
/// Cloning is cheap; every clone talks to the same client.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    config: StoreConfig,
    store: Arc<dyn RemoteStore>,
}

impl Connection {
    /// Wrap an already-built store client.
    pub fn new(config: StoreConfig, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner { config, store }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.inner.store
    }

    /// Returns true when both handles share one underlying connection.
    pub fn same_as(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Owns the one connection of an application.
///
/// The composition root creates a `Connector` and passes it (or the
/// [`Connection`] it yields) to whatever needs the store. The first
/// [`initialize`](Connector::initialize) builds the client; later calls with
/// an equal configuration return the same connection, concurrent callers
/// included.
pub struct Connector {
    factory: StoreFactory,
    cell: OnceCell<Connection>,
    initializing: AtomicBool,
}

impl Connector {
    /// Create a connector that builds clients with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&StoreConfig) -> Result<Arc<dyn RemoteStore>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            cell: OnceCell::new(),
            initializing: AtomicBool::new(false),
        }
    }

    /// A connector choosing the file or REST backend from the endpoint URL.
    pub fn with_default_backends() -> Self {
        Self::new(crate::backend::open_store)
    }

    pub fn state(&self) -> ConnectorState {
        if self.cell.initialized() {
            ConnectorState::Ready
        } else if self.initializing.load(Ordering::Acquire) {
            ConnectorState::Initializing
        } else {
            ConnectorState::Uninitialized
        }
    }

    /// The connection, if one has been initialized.
    pub fn connection(&self) -> Option<Connection> {
        self.cell.get().cloned()
    }

    /// Initialize the connection, or return the existing one.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInitialized`] if a connection exists for a
    ///   different configuration
    /// - any error from the factory; the connector stays uninitialized and a
    ///   later call may retry
    #[instrument(skip(self, config), fields(project = %config.project_id, endpoint = %config.endpoint))]
    pub async fn initialize(&self, config: StoreConfig) -> Result<Connection> {
        let connection = self
            .cell
            .get_or_try_init(|| async {
                self.initializing.store(true, Ordering::Release);
                let built = (self.factory)(&config);
                self.initializing.store(false, Ordering::Release);

                let store = built?;
                info!("Connected to document store");
                Ok::<_, Error>(Connection::new(config.clone(), store))
            })
            .await?;

        if connection.config() != &config {
            warn!("Connector already initialized with a different configuration");
            return Err(Error::AlreadyInitialized);
        }

        Ok(connection.clone())
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("state", &self.state())
            .finish()
    }
}
