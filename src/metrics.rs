//! Metrics for cache operations.
//!
//! Every cache keeps a set of counters that can be read back as a
//! [`CacheStats`] snapshot. Additionally, each event can be forwarded to a
//! user-provided [`MetricsSink`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use request_cache::{CacheMetric, MetricsSink, RequestCache};
//!
//! struct BufferedSink {
//!     buffer: Mutex<Vec<CacheMetric>>,
//! }
//!
//! impl MetricsSink for BufferedSink {
//!     fn emit(&self, metric: CacheMetric) {
//!         self.buffer.lock().unwrap().push(metric);
//!     }
//! }
//!
//! let cache: RequestCache<String, String> = RequestCache::builder()
//!     .name("features")
//!     .metrics_sink(Arc::new(BufferedSink { buffer: Mutex::new(Vec::new()) }))
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Status of a key on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Entry is fresh and was served as is.
    Fresh,
    /// Entry is stale but was served while being revalidated.
    Stale,
    /// No usable entry, a fetch was needed.
    Miss,
}

/// Metrics emitted by a cache.
#[derive(Debug, Clone)]
pub enum CacheMetric {
    /// Emitted on every lookup.
    Read {
        /// Name of the cache.
        cache: &'static str,
        status: ReadStatus,
    },
    /// Emitted when a fetcher settles.
    Fetch {
        /// Name of the cache.
        cache: &'static str,
        /// Whether this was a stale-while-revalidate refresh.
        background: bool,
        /// Whether the fetcher succeeded.
        ok: bool,
        latency: Duration,
    },
    /// Emitted when an entry is removed to stay within `max_entries`.
    Evicted {
        /// Name of the cache.
        cache: &'static str,
    },
    /// Emitted after each periodic sweep.
    Swept {
        /// Name of the cache.
        cache: &'static str,
        /// Number of dead entries removed.
        removed: usize,
    },
}

/// Trait for receiving cache metrics.
///
/// This is called synchronously in the hot path of cache operations, but never
/// while the cache's internal lock is held, so a sink may read from the cache.
/// Implementations should be fast (e.g., buffer metrics in memory).
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    fn emit(&self, metric: CacheMetric);
}

/// Point-in-time snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a fresh entry.
    pub hits: u64,
    /// Lookups served from a stale entry.
    pub stale_hits: u64,
    /// Lookups that found no usable entry.
    pub misses: u64,
    /// Blocking fetches started.
    pub fetches: u64,
    /// Background refreshes started.
    pub background_refreshes: u64,
    /// Fetches (blocking or background) that failed or were aborted.
    pub fetch_errors: u64,
    /// Entries removed to stay within `max_entries`.
    pub evictions: u64,
    /// Dead entries removed, lazily or by the sweeper.
    pub expirations: u64,
    /// Entries removed by `invalidate_by`.
    pub invalidations: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    background_refreshes: AtomicU64,
    fetch_errors: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

/// Records counters and forwards events to the optional sink.
pub(crate) struct Recorder {
    name: &'static str,
    counters: Counters,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("name", &self.name)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl Recorder {
    pub fn new(name: &'static str, sink: Option<Arc<dyn MetricsSink>>) -> Self {
        Recorder {
            name,
            counters: Counters::default(),
            sink,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn emit(&self, metric: CacheMetric) {
        if let Some(sink) = &self.sink {
            sink.emit(metric);
        }
    }

    pub fn read(&self, status: ReadStatus) {
        let counter = match status {
            ReadStatus::Fresh => &self.counters.hits,
            ReadStatus::Stale => &self.counters.stale_hits,
            ReadStatus::Miss => &self.counters.misses,
        };
        bump(counter, 1);
        self.emit(CacheMetric::Read {
            cache: self.name,
            status,
        });
    }

    pub fn fetch_started(&self, background: bool) {
        if background {
            bump(&self.counters.background_refreshes, 1);
        } else {
            bump(&self.counters.fetches, 1);
        }
    }

    pub fn fetch_settled(&self, background: bool, ok: bool, latency: Duration) {
        if !ok {
            bump(&self.counters.fetch_errors, 1);
        }
        self.emit(CacheMetric::Fetch {
            cache: self.name,
            background,
            ok,
            latency,
        });
    }

    pub fn evicted(&self) {
        bump(&self.counters.evictions, 1);
        self.emit(CacheMetric::Evicted { cache: self.name });
    }

    pub fn expired(&self, count: usize) {
        bump(&self.counters.expirations, count as u64);
    }

    pub fn swept(&self, removed: usize) {
        self.expired(removed);
        self.emit(CacheMetric::Swept {
            cache: self.name,
            removed,
        });
    }

    pub fn invalidated(&self, count: usize) {
        bump(&self.counters.invalidations, count as u64);
    }

    pub fn snapshot(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            stale_hits: c.stale_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            fetches: c.fetches.load(Ordering::Relaxed),
            background_refreshes: c.background_refreshes.load(Ordering::Relaxed),
            fetch_errors: c.fetch_errors.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            expirations: c.expirations.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
        }
    }
}
