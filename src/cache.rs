use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::builder::RequestCacheBuilder;
use crate::config::CacheConfig;
use crate::entry::{Entry, Freshness};
use crate::error::CacheError;
use crate::inflight::InFlightTable;
use crate::metrics::{CacheStats, MetricsSink, Recorder};
use crate::store::{EntryStore, Lookup};
use crate::sweeper;

/// Default error type of fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything guarded by the cache lock.
pub(crate) struct State<K, V, E> {
    pub store: EntryStore<K, V>,
    pub in_flight: InFlightTable<K, V, E>,
    pub disposed: bool,
}

pub(crate) struct Inner<K, V, E> {
    pub config: CacheConfig,
    pub state: Mutex<State<K, V, E>>,
    pub recorder: Recorder,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V, E> Drop for Inner<K, V, E> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

impl<K, V, E> Inner<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn name(&self) -> &'static str {
        self.recorder.name()
    }

    /// Write an entry while holding the lock.
    ///
    /// Returns whether an entry was evicted. The caller records the eviction
    /// once the lock is released.
    #[must_use]
    pub fn write_locked(
        &self,
        state: &mut State<K, V, E>,
        key: K,
        value: V,
        ttl: Duration,
        swr: Duration,
    ) -> bool {
        if state.disposed {
            tracing::debug!(cache = self.name(), "ignoring write to disposed cache");
            return false;
        }

        let entry = Entry::new(value, Instant::now(), ttl, swr);
        let evicted = state.store.insert(key, entry).is_some();
        if evicted {
            tracing::debug!(cache = self.name(), "evicted oldest entry");
        }
        evicted
    }

    /// Remove all dead entries.
    pub fn sweep(&self) -> usize {
        let removed = self.state.lock().store.sweep(Instant::now());
        tracing::debug!(cache = self.name(), removed, "swept expired entries");
        self.recorder.swept(removed);
        removed
    }
}

/// An in-memory, key-addressed memoization layer.
///
/// Entries expire after a time-to-live and may optionally be served
/// stale while they are revalidated in the background. Concurrent
/// [`get_or_set`](Self::get_or_set) calls for the same key share a single
/// fetch. When `max_entries` is configured the oldest inserted entry is
/// evicted to make room, and a periodic sweeper can reclaim dead entries.
///
/// `RequestCache` is a cheap handle; clones share the same state.
pub struct RequestCache<K, V, E = BoxError> {
    pub(crate) inner: Arc<Inner<K, V, E>>,
}

impl<K, V, E> Clone for RequestCache<K, V, E> {
    fn clone(&self) -> Self {
        RequestCache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, E> fmt::Debug for RequestCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("name", &self.inner.recorder.name())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<K, V, E> RequestCache<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new cache from `config`.
    ///
    /// Fails if the configuration is invalid, or if a cleanup interval is
    /// configured outside of a tokio runtime.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_parts(config, "request_cache", None)
    }

    /// Start building a cache with the default configuration.
    pub fn builder() -> RequestCacheBuilder<K, V, E> {
        RequestCacheBuilder::new()
    }

    pub(crate) fn with_parts(
        config: CacheConfig,
        name: &'static str,
        sink: Option<Arc<dyn MetricsSink>>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let inner = Arc::new(Inner {
            config,
            state: Mutex::new(State {
                store: EntryStore::new(config.max_entries),
                in_flight: InFlightTable::new(),
                disposed: false,
            }),
            recorder: Recorder::new(name, sink),
            sweeper: Mutex::new(None),
        });

        if let Some(interval) = config.cleanup_interval {
            let handle = sweeper::spawn(Arc::downgrade(&inner), interval)?;
            *inner.sweeper.lock() = Some(handle);
        }

        tracing::debug!(cache = name, ?config, "created request cache");
        Ok(RequestCache { inner })
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the cached value while it is fresh.
    ///
    /// Stale entries are not returned here, they are only served through
    /// [`get_or_set`](Self::get_or_set). Dead entries are removed.
    pub fn get(&self, key: &K) -> Option<V> {
        let lookup = self.inner.state.lock().store.lookup(key, Instant::now());
        match lookup {
            Lookup::Fresh(value) => Some(value),
            Lookup::Expired => {
                self.inner.recorder.expired(1);
                None
            }
            Lookup::Stale(_) | Lookup::Absent => None,
        }
    }

    /// Classify the entry for `key` without touching it.
    pub fn freshness(&self, key: &K) -> Option<Freshness> {
        self.inner.state.lock().store.freshness(key, Instant::now())
    }

    /// Whether [`get`](Self::get) would currently return a value.
    pub fn has(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Set the value in the cache using the default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, None);
    }

    /// Set the value in the cache, optionally overriding the default TTL.
    ///
    /// This always creates a new entry. A fetch for the same key that is
    /// still outstanding will not overwrite it when it settles.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Option<Duration>) {
        let config = &self.inner.config;
        let ttl = ttl.unwrap_or(config.default_ttl);
        let swr = config.swr_window(config.enable_swr);

        let evicted = {
            let mut state = self.inner.state.lock();
            state.in_flight.supersede(&key);
            self.inner.write_locked(&mut state, key, value, ttl, swr)
        };
        if evicted {
            self.inner.recorder.evicted();
        }
    }

    /// Remove the key from the cache, returning whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        let mut state = self.inner.state.lock();
        state.in_flight.supersede(key);
        state.store.remove(key)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.in_flight.supersede_all();
        state.store.clear();
    }

    /// Number of stored entries, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.inner.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys in insertion order, including expired ones not yet cleaned up.
    pub fn keys(&self) -> Vec<K> {
        self.inner.state.lock().store.keys()
    }

    /// Remove every entry whose key matches `predicate`, returning how many were removed.
    ///
    /// Outstanding fetches for matching keys still settle for their callers
    /// but are no longer written back.
    pub fn invalidate_by<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&K) -> bool,
    {
        let removed = {
            let mut state = self.inner.state.lock();
            state.in_flight.supersede_matching(&mut predicate);
            state.store.remove_matching(&mut predicate).len()
        };
        tracing::debug!(cache = self.inner.name(), removed, "invalidated entries");
        self.inner.recorder.invalidated(removed);
        removed
    }

    /// Whether a fetch (blocking or background) is outstanding for `key`.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inner.state.lock().in_flight.contains(key)
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Run a sweep immediately, returning the number of dead entries removed.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Snapshot of this cache's counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.recorder.snapshot()
    }

    /// Stop the sweeper and release all entries.
    ///
    /// Outstanding fetches still settle for their callers, but nothing is
    /// stored anymore. Calling this more than once is harmless.
    pub fn dispose(&self) {
        if let Some(handle) = self.inner.sweeper.lock().take() {
            handle.abort();
        }

        let mut state = self.inner.state.lock();
        if !state.disposed {
            tracing::debug!(cache = self.inner.name(), "disposing request cache");
        }
        state.disposed = true;
        state.in_flight.supersede_all();
        state.store.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }
}
