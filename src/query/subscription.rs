//! Read bindings.
//!
//! A [`Subscription`] binds a key, a fetcher, and an enabled flag to a cache
//! entry. Subscribers to the same key share one entry and one in-flight
//! fetch. Dropping a subscription detaches it without cancelling the fetch.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::Stream;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

use super::client::QueryClient;
use super::entry::{AnyValue, CacheEntry, EntryState, Fetcher};
use super::key::QueryKey;
use crate::{AdminError, Result};

/// Everything needed to bind a read: key, fetcher, and enablement.
pub struct QueryOptions<T> {
    key: QueryKey,
    fetcher: Fetcher,
    enabled: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryOptions<T> {
    pub fn new<F, Fut>(key: QueryKey, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || -> BoxFuture<'static, Result<AnyValue>> {
            let fut = fetch();
            Box::pin(async move { fut.await.map(|value| Arc::new(value) as AnyValue) })
        });
        Self {
            key,
            fetcher,
            enabled: true,
            _marker: PhantomData,
        }
    }

    /// While disabled, no fetch is issued and the last cached value is shown.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Outcome of a read as seen by one subscriber.
#[derive(Debug)]
pub enum QueryState<T> {
    /// Disabled, or not fetched yet, with nothing cached.
    Idle,
    /// First fetch in flight, nothing cached.
    Loading,
    /// Data is available. `fetching` is set while a refetch runs.
    Loaded {
        data: Arc<T>,
        stale: bool,
        fetching: bool,
    },
    /// The last fetch failed. Previously loaded data stays visible.
    Errored {
        error: Arc<AdminError>,
        data: Option<Arc<T>>,
    },
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Loaded {
                data,
                stale,
                fetching,
            } => Self::Loaded {
                data: Arc::clone(data),
                stale: *stale,
                fetching: *fetching,
            },
            Self::Errored { error, data } => Self::Errored {
                error: Arc::clone(error),
                data: data.clone(),
            },
        }
    }
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Loaded { data, .. } => Some(data),
            Self::Errored { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// First load in progress.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Any fetch in progress, first load or refetch.
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Loading | Self::Loaded { fetching: true, .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Errored { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Loaded { stale: true, .. })
    }

    pub fn error(&self) -> Option<&AdminError> {
        match self {
            Self::Errored { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Normalized message of the current error.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(AdminError::message)
    }
}

fn project<T: Send + Sync + 'static>(state: &EntryState, key: &QueryKey) -> QueryState<T> {
    let data = match state.data.clone().map(|value| value.downcast::<T>()) {
        Some(Ok(data)) => Some(data),
        Some(Err(_)) => {
            return QueryState::Errored {
                error: Arc::new(AdminError::InvalidInput(format!(
                    "cached value for {key} has a different type"
                ))),
                data: None,
            };
        }
        None => None,
    };

    if state.loading {
        return match data {
            Some(data) => QueryState::Loaded {
                data,
                stale: state.stale,
                fetching: true,
            },
            None => QueryState::Loading,
        };
    }
    if let Some(error) = &state.error {
        return QueryState::Errored {
            error: Arc::clone(error),
            data,
        };
    }
    match data {
        Some(data) => QueryState::Loaded {
            data,
            stale: state.stale,
            fetching: false,
        },
        None => QueryState::Idle,
    }
}

/// A live read binding. Detaches from its entry on drop.
pub struct Subscription<T: Send + Sync + 'static> {
    client: QueryClient,
    entry: Arc<CacheEntry>,
    rx: watch::Receiver<EntryState>,
    enabled: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        self.entry.key()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> QueryState<T> {
        let state = self.rx.borrow().clone();
        project(&state, self.entry.key())
    }

    /// Wait for the next state change.
    pub async fn changed(&mut self) -> QueryState<T> {
        // The sender lives in the entry we hold, so this cannot fail.
        let _ = self.rx.changed().await;
        let state = self.rx.borrow_and_update().clone();
        project(&state, self.entry.key())
    }

    /// Wait until no fetch is in flight and return the settled state.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if !state.loading {
                return project(&state, self.entry.key());
            }
            if self.rx.changed().await.is_err() {
                return project(&state, self.entry.key());
            }
        }
    }

    /// Stream of states, starting with the current one.
    pub fn updates(&self) -> impl Stream<Item = QueryState<T>> + Send + use<T> {
        let key = self.entry.key().clone();
        WatchStream::new(self.rx.clone()).map(move |state| project(&state, &key))
    }

    /// Enable or disable fetching. Enabling fetches if nothing fresh is cached.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.entry.set_active(enabled);
        self.enabled = enabled;
        if enabled && self.entry.needs_fetch() {
            self.entry.fetch();
        }
    }

    /// Rebind to new options.
    ///
    /// A changed key moves the subscription to that key's entry and fetches
    /// it once when enabled, even if that entry holds fresh data. The same
    /// key only updates the fetcher and enablement.
    pub fn rebind(&mut self, options: QueryOptions<T>) {
        if &options.key == self.entry.key() {
            self.entry.set_fetcher(options.fetcher);
            self.set_enabled(options.enabled);
            return;
        }

        let entry = self
            .client
            .acquire(options.key, options.fetcher, options.enabled, true);
        let previous = std::mem::replace(&mut self.entry, entry);
        self.client.release(&previous, self.enabled);
        self.rx = self.entry.watch();
        self.enabled = options.enabled;
    }

    /// Fetch again regardless of freshness, attaching to any in-flight fetch.
    pub fn refetch(&self) {
        self.entry.fetch();
    }
}

impl<T: Send + Sync + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.client.release(&self.entry, self.enabled);
    }
}

impl QueryClient {
    /// Subscribe to a read.
    ///
    /// Must be called within a tokio runtime when the read is enabled.
    pub fn subscribe<T: Send + Sync + 'static>(&self, options: QueryOptions<T>) -> Subscription<T> {
        let enabled = options.enabled;
        let entry = self.acquire(options.key, options.fetcher, enabled, false);
        let rx = entry.watch();
        Subscription {
            client: self.clone(),
            entry,
            rx,
            enabled,
            _marker: PhantomData,
        }
    }

    /// Read through the cache once: subscribe, wait for the fetch, detach.
    pub async fn fetch<T: Send + Sync + 'static>(&self, options: QueryOptions<T>) -> Result<Arc<T>> {
        let mut subscription = self.subscribe(options.enabled(true));
        match subscription.settled().await {
            QueryState::Loaded { data, .. } => Ok(data),
            QueryState::Errored { error, .. } => Err(AdminError::Cached(error)),
            QueryState::Idle | QueryState::Loading => Err(AdminError::Unclassified(None)),
        }
    }
}
