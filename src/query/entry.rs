//! Cache entries and their fetch lifecycle.
//!
//! An entry owns the last fetched value for one [`QueryKey`], its freshness,
//! and whether a fetch is in flight. State changes are published through a
//! `tokio::sync::watch` channel that every subscription holds a receiver of.
//!
//! At most one fetch per entry runs at a time. A fetch requested while one is
//! in flight attaches to it. Invalidation during a fetch bumps the entry's
//! generation; the fetch still stores its result, but as stale, and starts a
//! follow-up fetch if anyone is subscribed.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::retry::{RetryConfig, with_retry};
use crate::telemetry;
use crate::{AdminError, Result};

pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyValue>> + Send + Sync>;

/// Lifecycle state of a cache entry.
///
/// `Unloaded → Loading → {Loaded, Errored}`, `Loaded → Stale → Loading`,
/// `Errored → Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Unloaded,
    Loading,
    Loaded,
    Stale,
    Errored,
}

/// Published state of an entry.
#[derive(Clone)]
pub(crate) struct EntryState {
    pub data: Option<AnyValue>,
    pub error: Option<Arc<AdminError>>,
    pub stale: bool,
    pub loading: bool,
    pub updated_at: Option<Instant>,
}

impl EntryState {
    fn empty() -> Self {
        Self {
            data: None,
            error: None,
            stale: false,
            loading: false,
            updated_at: None,
        }
    }

    pub fn status(&self) -> EntryStatus {
        if self.loading {
            EntryStatus::Loading
        } else if self.error.is_some() {
            EntryStatus::Errored
        } else if self.data.is_none() {
            EntryStatus::Unloaded
        } else if self.stale {
            EntryStatus::Stale
        } else {
            EntryStatus::Loaded
        }
    }
}

/// Point-in-time view of an entry, for inspection and tests.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub key: QueryKey,
    pub status: EntryStatus,
    pub has_data: bool,
    pub subscribers: usize,
    pub updated_at: Option<Instant>,
}

struct Control {
    subscribers: usize,
    /// Subscribers with fetching enabled.
    active: usize,
    fetcher: Option<Fetcher>,
    generation: u64,
    in_flight: bool,
}

pub(crate) struct CacheEntry {
    key: QueryKey,
    state: watch::Sender<EntryState>,
    control: Mutex<Control>,
    retry: RetryConfig,
    stale_time: Option<Duration>,
}

impl CacheEntry {
    pub fn new(key: QueryKey, retry: RetryConfig, stale_time: Option<Duration>) -> Arc<Self> {
        let (state, _) = watch::channel(EntryState::empty());
        Arc::new(Self {
            key,
            state,
            control: Mutex::new(Control {
                subscribers: 0,
                active: 0,
                fetcher: None,
                generation: 0,
                in_flight: false,
            }),
            retry,
            stale_time,
        })
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn watch(&self) -> watch::Receiver<EntryState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> EntryState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> EntrySnapshot {
        let subscribers = self.control().subscribers;
        let state = self.state.borrow();
        EntrySnapshot {
            key: self.key.clone(),
            status: state.status(),
            has_data: state.data.is_some(),
            subscribers,
            updated_at: state.updated_at,
        }
    }

    pub fn attach(&self, fetcher: Fetcher, enabled: bool) {
        let mut control = self.control();
        control.subscribers += 1;
        if enabled {
            control.active += 1;
        }
        control.fetcher = Some(fetcher);
    }

    /// Detach one subscriber, returning how many remain.
    pub fn detach(&self, enabled: bool) -> usize {
        let mut control = self.control();
        control.subscribers = control.subscribers.saturating_sub(1);
        if enabled {
            control.active = control.active.saturating_sub(1);
        }
        control.subscribers
    }

    pub fn set_active(&self, enabled: bool) {
        let mut control = self.control();
        if enabled {
            control.active += 1;
        } else {
            control.active = control.active.saturating_sub(1);
        }
    }

    pub fn set_fetcher(&self, fetcher: Fetcher) {
        self.control().fetcher = Some(fetcher);
    }

    /// Whether a newly enabled subscriber should trigger a fetch.
    pub fn needs_fetch(&self) -> bool {
        let state = self.state.borrow();
        if state.data.is_none() || state.error.is_some() || state.stale {
            return true;
        }
        match (self.stale_time, state.updated_at) {
            (Some(stale_time), Some(updated_at)) => updated_at.elapsed() >= stale_time,
            _ => false,
        }
    }

    /// Start a fetch unless one is already in flight.
    ///
    /// Returns `true` if a new fetch was started.
    pub fn fetch(self: &Arc<Self>) -> bool {
        let mut control = self.control();
        if control.in_flight {
            metrics::counter!(telemetry::QUERY_DEDUP_TOTAL).increment(1);
            return false;
        }
        let Some(fetcher) = control.fetcher.clone() else {
            return false;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(key = %self.key, "fetch requested outside of a tokio runtime");
            self.state.send_modify(|s| {
                s.error = Some(Arc::new(AdminError::Configuration(
                    "no tokio runtime available for fetching".to_string(),
                )));
            });
            return false;
        };

        control.in_flight = true;
        let generation = control.generation;
        self.state.send_modify(|s| s.loading = true);
        drop(control);

        debug!(key = %self.key, generation, "fetch started");
        let entry = Arc::clone(self);
        runtime.spawn(async move {
            let label = entry.key.to_string();
            let result = with_retry(&entry.retry, &label, || fetcher()).await;
            entry.complete(generation, result);
        });
        true
    }

    fn complete(self: &Arc<Self>, generation: u64, result: Result<AnyValue>) {
        let mut control = self.control();
        control.in_flight = false;
        let superseded = control.generation != generation;
        let ok = result.is_ok();

        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(value) => {
                    s.data = Some(value);
                    s.error = None;
                    s.stale = superseded;
                    s.updated_at = Some(Instant::now());
                }
                Err(e) => {
                    warn!(key = %self.key, error = %e, "fetch failed");
                    s.error = Some(Arc::new(e));
                }
            }
        });

        metrics::counter!(telemetry::QUERY_FETCHES_TOTAL,
            "status" => if ok { "ok" } else { "error" },
        )
        .increment(1);
        debug!(key = %self.key, ok, superseded, "fetch finished");

        let refetch = superseded && control.active > 0;
        drop(control);
        if refetch {
            self.fetch();
        }
    }

    /// Mark the entry stale, refetching if an enabled subscriber is attached.
    ///
    /// Returns `true` if fresh data is on its way: a refetch was started, or
    /// the running fetch will follow up with one.
    pub fn invalidate(self: &Arc<Self>) -> bool {
        let mut control = self.control();
        control.generation += 1;
        self.state.send_modify(|s| s.stale = true);
        let active = control.active > 0;
        let in_flight = control.in_flight;
        drop(control);

        if in_flight {
            // The running fetch sees the new generation and follows up only
            // while someone is still subscribed.
            return active;
        }
        active && self.fetch()
    }
}
