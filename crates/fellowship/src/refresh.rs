//! Polling refresh for list views.
//!
//! A [`ListRefresher`] describes one list: a collection, a query, how often
//! to poll, and how to sort. Each [`activate`](ListRefresher::activate)
//! starts a background task that publishes [`ListState`]s until the returned
//! [`ListSubscription`] is dropped or deactivated.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, instrument, warn};

use fellowship_core::document::RemoteDocument;
use fellowship_core::error::Error;
use fellowship_core::query::{Direction, QuerySpec, order_values};
use fellowship_core::Result;

use crate::accessor::{Accessor, CollectionHandle, Origin};

/// Default time between list fetches.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// Client-side ordering applied after every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortPolicy {
    pub field: String,
    pub direction: Direction,
}

impl SortPolicy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Stable sort on the field; documents without it go last in either
    /// direction.
    pub fn apply(&self, documents: &mut [RemoteDocument]) {
        documents.sort_by(|a, b| match (a.get(&self.field), b.get(&self.field)) {
            (Some(x), Some(y)) => {
                let ord = order_values(x, y);
                match self.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
}

/// What a list view shows.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Documents currently on screen.
    pub documents: Vec<RemoteDocument>,
    /// Source of `documents`; `None` until something has been loaded.
    pub origin: Option<Origin>,
    /// The last fetch error, cleared by the next successful fetch.
    pub error: Option<Arc<Error>>,
}

impl ListState {
    pub fn is_loaded(&self) -> bool {
        self.origin.is_some()
    }
}

/// A polling policy for one list.
#[derive(Debug, Clone)]
pub struct ListRefresher {
    accessor: Accessor,
    handle: CollectionHandle,
    query: QuerySpec,
    interval: Duration,
    sort: Option<SortPolicy>,
}

impl ListRefresher {
    pub fn new(accessor: Accessor, handle: CollectionHandle, query: QuerySpec) -> Self {
        Self {
            accessor,
            handle,
            query,
            interval: DEFAULT_INTERVAL,
            sort: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_sort(mut self, sort: SortPolicy) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start refreshing.
    ///
    /// The cached snapshot, if any, is published first. Then the list is
    /// fetched immediately and once per interval. Must be called within a
    /// tokio runtime.
    pub fn activate(&self) -> ListSubscription {
        let (tx, rx) = watch::channel(ListState::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.clone().run(tx, cancel.clone()));

        ListSubscription {
            receiver: rx,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
            task,
        }
    }

    fn sorted(&self, mut documents: Vec<RemoteDocument>) -> Vec<RemoteDocument> {
        if let Some(sort) = &self.sort {
            sort.apply(&mut documents);
        }
        documents
    }

    #[instrument(skip_all, fields(collection = %self.handle, interval_ms = self.interval.as_millis() as u64))]
    async fn run(self, tx: watch::Sender<ListState>, cancel: CancellationToken) {
        match self.accessor.cached(&self.handle, &self.query).await {
            Ok(Some(documents)) => {
                let documents = self.sorted(documents);
                tx.send_modify(|state| {
                    state.documents = documents;
                    state.origin = Some(Origin::Cache);
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read cached list"),
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self
                .accessor
                .fetch_cancellable(&self.handle, &self.query, &cancel)
                .await
            {
                Ok(snapshot) => {
                    let documents = self.sorted(snapshot.documents);
                    let origin = snapshot.origin;
                    tx.send_if_modified(|state| {
                        let changed = state.documents != documents
                            || state.origin != Some(origin)
                            || state.error.is_some();
                        if changed {
                            state.documents = documents;
                            state.origin = Some(origin);
                            state.error = None;
                        }
                        changed
                    });
                }
                Err(Error::Cancelled) => break,
                Err(err) => {
                    warn!(error = %err, "List refresh failed");
                    tx.send_modify(|state| state.error = Some(Arc::new(err)));
                }
            }
        }

        debug!("List refresh stopped");
    }
}

/// A running refresh. Dropping it stops the refresh.
#[derive(Debug)]
pub struct ListSubscription {
    receiver: watch::Receiver<ListState>,
    cancel: CancellationToken,
    _guard: DropGuard,
    task: JoinHandle<()>,
}

impl ListSubscription {
    /// The latest published state.
    pub fn state(&self) -> ListState {
        self.receiver.borrow().clone()
    }

    /// A receiver for driving a view directly.
    pub fn receiver(&self) -> watch::Receiver<ListState> {
        self.receiver.clone()
    }

    /// Wait for the next published state.
    ///
    /// Returns [`Error::Cancelled`] once the refresh has stopped.
    pub async fn changed(&mut self) -> Result<ListState> {
        self.receiver
            .changed()
            .await
            .map_err(|_| Error::Cancelled)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop refreshing and wait for the background task to finish.
    pub async fn deactivate(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "List refresh task failed");
        }
    }
}
