//! Builder API for creating cache instances.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::RequestCache;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::metrics::MetricsSink;

/// Builder for [`RequestCache`] instances.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use request_cache::RequestCache;
///
/// let cache: RequestCache<String, Vec<Feature>> = RequestCache::builder()
///     .name("features")
///     .default_ttl(Duration::from_secs(30))
///     .swr(Duration::from_secs(60))
///     .max_entries(1_000)
///     .cleanup_interval(Duration::from_secs(300))
///     .build()?;
/// ```
pub struct RequestCacheBuilder<K, V, E> {
    config: CacheConfig,
    name: &'static str,
    sink: Option<Arc<dyn MetricsSink>>,
    _marker: PhantomData<fn() -> (K, V, E)>,
}

impl<K, V, E> fmt::Debug for RequestCacheBuilder<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCacheBuilder")
            .field("config", &self.config)
            .field("name", &self.name)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl<K, V, E> RequestCacheBuilder<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::from_config(CacheConfig::default())
    }

    /// Create a new builder starting from `config`.
    pub fn from_config(config: CacheConfig) -> Self {
        RequestCacheBuilder {
            config,
            name: "request_cache",
            sink: None,
            _marker: PhantomData,
        }
    }

    /// A name for logs and metrics.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the default time-to-live.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Enables stale-while-revalidate with the given window past the TTL.
    pub fn swr(mut self, window: Duration) -> Self {
        self.config.enable_swr = true;
        self.config.swr_ttl = window;
        self
    }

    /// Sets the maximum number of entries.
    pub fn max_entries(mut self, max: usize) -> Self {
        self.config.max_entries = Some(max);
        self
    }

    /// Sets the interval of the background sweep.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.config.cleanup_interval = Some(interval);
        self
    }

    /// Forward every metric to `sink`.
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and build the cache.
    pub fn build(self) -> Result<RequestCache<K, V, E>, CacheError> {
        RequestCache::with_parts(self.config, self.name, self.sink)
    }
}

impl<K, V, E> Default for RequestCacheBuilder<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
