//! The process-wide cache registry.
//!
//! [`QueryClient`] owns every [`CacheEntry`]. It is constructed once at
//! application start and handed to the bindings that need it; cloning is
//! cheap and shares the registry.
//!
//! # Entry lifetime
//!
//! Entries with at least one subscriber live in the `live` map. When the last
//! subscriber detaches, the entry moves into a bounded moka cache for
//! `gc_time`. A subscriber returning inside that window gets the entry back,
//! including any fetch that was still running. Afterwards moka evicts it.
//!
//! Both stores are only touched under the `live` lock, so a key never has two
//! entries at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use super::entry::{CacheEntry, EntrySnapshot, EntryStatus, Fetcher};
use super::key::{KeyFilter, QueryKey};
use super::retry::RetryConfig;
use crate::telemetry;

/// Configuration for a [`QueryClient`].
///
/// ```rust
/// # use docbox_admin::{QueryConfig, RetryConfig};
/// # use std::time::Duration;
/// let config = QueryConfig::new()
///     .gc_time(Duration::from_secs(60))
///     .retry(RetryConfig::disabled());
/// assert_eq!(config.max_retained, 1_000);
/// ```
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Retry policy for fetches.
    pub retry: RetryConfig,
    /// How long an entry without subscribers is kept. Default: 5 minutes.
    pub gc_time: Duration,
    /// Age after which loaded data counts as stale. Default: zero, so every
    /// new subscriber revalidates while the cached value stays visible.
    /// `None` keeps data fresh until invalidated.
    pub stale_time: Option<Duration>,
    /// Maximum number of entries kept without subscribers. Default: 1,000.
    pub max_retained: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            gc_time: Duration::from_secs(300),
            stale_time: Some(Duration::ZERO),
            max_retained: 1_000,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn stale_time(mut self, stale_time: Option<Duration>) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn max_retained(mut self, n: u64) -> Self {
        self.max_retained = n;
        self
    }
}

struct Registry {
    live: Mutex<HashMap<QueryKey, Arc<CacheEntry>>>,
    retained: Option<Cache<QueryKey, Arc<CacheEntry>>>,
    config: QueryConfig,
}

/// Shared registry of cache entries.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Registry>,
}

impl QueryClient {
    pub fn new(config: QueryConfig) -> Self {
        let retained = (!config.gc_time.is_zero() && config.max_retained > 0).then(|| {
            Cache::builder()
                .max_capacity(config.max_retained)
                .time_to_live(config.gc_time)
                .build()
        });
        Self {
            inner: Arc::new(Registry {
                live: Mutex::new(HashMap::new()),
                retained,
                config,
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    fn live(&self) -> MutexGuard<'_, HashMap<QueryKey, Arc<CacheEntry>>> {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a subscriber to the entry for `key`, creating it if needed.
    ///
    /// Starts a fetch when `enabled` and either `force` is set or the entry
    /// has nothing fresh to show. A fetch already in flight is reused.
    pub(crate) fn acquire(
        &self,
        key: QueryKey,
        fetcher: Fetcher,
        enabled: bool,
        force: bool,
    ) -> Arc<CacheEntry> {
        let entry = {
            let mut live = self.live();
            let entry = match live.get(&key) {
                Some(entry) => Arc::clone(entry),
                None => {
                    let revived = self.inner.retained.as_ref().and_then(|r| r.remove(&key));
                    let entry = revived.unwrap_or_else(|| {
                        debug!(key = %key, "cache entry created");
                        CacheEntry::new(
                            key.clone(),
                            self.inner.config.retry.clone(),
                            self.inner.config.stale_time,
                        )
                    });
                    live.insert(key, Arc::clone(&entry));
                    entry
                }
            };
            entry.attach(fetcher, enabled);
            entry
        };

        if enabled && (force || entry.needs_fetch()) {
            entry.fetch();
        }
        entry
    }

    /// Detach a subscriber, retiring the entry when it was the last one.
    pub(crate) fn release(&self, entry: &Arc<CacheEntry>, enabled: bool) {
        let mut live = self.live();
        if entry.detach(enabled) > 0 {
            return;
        }
        let key = entry.key();
        if live.get(key).is_some_and(|e| Arc::ptr_eq(e, entry)) {
            live.remove(key);
            if let Some(retained) = &self.inner.retained {
                retained.insert(key.clone(), Arc::clone(entry));
            }
            debug!(key = %key, "cache entry detached");
        }
    }

    /// Mark every entry matched by `filter` stale.
    ///
    /// Entries with enabled subscribers refetch immediately. The change is
    /// visible to any subscription made after this call returns. Returns the
    /// number of entries marked.
    pub fn invalidate(&self, filter: impl Into<KeyFilter>) -> usize {
        let filter = filter.into();
        let matched: Vec<Arc<CacheEntry>> = {
            let live = self.live();
            let mut matched: Vec<_> = live
                .iter()
                .filter(|(key, _)| filter.matches(key))
                .map(|(_, entry)| Arc::clone(entry))
                .collect();
            if let Some(retained) = &self.inner.retained {
                matched.extend(
                    retained
                        .iter()
                        .filter(|(key, _)| filter.matches(key))
                        .map(|(_, entry)| entry),
                );
            }
            matched
        };

        let mut refetched = 0;
        for entry in &matched {
            if entry.invalidate() {
                refetched += 1;
            }
        }

        metrics::counter!(telemetry::INVALIDATIONS_TOTAL).increment(matched.len() as u64);
        debug!(
            key = %filter.key(),
            matched = matched.len(),
            refetched,
            "invalidated cache entries"
        );
        matched.len()
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&self) -> usize {
        self.invalidate(KeyFilter::Prefix(QueryKey::default()))
    }

    /// Evict every entry.
    ///
    /// Used on shutdown. Existing subscriptions keep their entries alive but
    /// those entries are no longer reachable through this client.
    pub fn clear(&self) {
        self.live().clear();
        if let Some(retained) = &self.inner.retained {
            retained.invalidate_all();
        }
    }

    fn find(&self, key: &QueryKey) -> Option<Arc<CacheEntry>> {
        let live = self.live();
        live.get(key)
            .cloned()
            .or_else(|| self.inner.retained.as_ref().and_then(|r| r.get(key)))
    }

    /// Inspect the entry for `key`, live or retained.
    pub fn snapshot(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        self.find(key).map(|entry| entry.snapshot())
    }

    pub fn status(&self, key: &QueryKey) -> Option<EntryStatus> {
        self.snapshot(key).map(|s| s.status)
    }

    /// Cached value for `key`, if present and of type `T`.
    pub fn get_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.find(key)?.current().data?.downcast::<T>().ok()
    }

    /// Number of entries with at least one subscriber.
    pub fn live_len(&self) -> usize {
        self.live().len()
    }

    /// Number of entries waiting out their retention window.
    pub fn retained_len(&self) -> u64 {
        match &self.inner.retained {
            Some(retained) => {
                retained.run_pending_tasks();
                retained.entry_count()
            }
            None => 0,
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}
