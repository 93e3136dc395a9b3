use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{Inner, RequestCache, State};
use crate::error::FetchError;
use crate::inflight::{FetchChannel, FetchOutcome, Settled, fetch_channel};
use crate::metrics::ReadStatus;
use crate::store::Lookup;

/// Options for [`RequestCache::get_or_set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOrSetOptions {
    /// Time-to-live for the fetched value. Defaults to the cache's `default_ttl`.
    pub ttl: Option<Duration>,
    /// Skip the cache lookup and fetch unconditionally.
    ///
    /// A fetch that is already outstanding for the key is still shared.
    pub force_refresh: bool,
    /// Override whether stale-while-revalidate applies to this call.
    pub swr: Option<bool>,
}

impl GetOrSetOptions {
    /// Write the fetched value with `ttl` instead of the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Fetch even if a fresh or stale entry exists.
    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    /// Enable or disable stale-while-revalidate for this call only.
    pub fn with_swr(mut self, enabled: bool) -> Self {
        self.swr = Some(enabled);
        self
    }
}

/// How a settled fetch writes its value.
#[derive(Debug, Clone, Copy)]
struct WriteParams {
    ttl: Duration,
    swr: Duration,
}

/// What a lookup in `get_or_set` settled on while the lock was held.
enum Resolved<V, E> {
    Ready(V),
    Wait(FetchChannel<V, E>),
}

/// Removes the in-flight record of a fetch task, also when the task unwinds.
struct SettleGuard<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    inner: Arc<Inner<K, V, E>>,
    key: Option<K>,
    id: u64,
    background: bool,
}

impl<K, V, E> SettleGuard<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Display,
{
    /// Settle the record with `result`, writing it back if it is still wanted.
    fn complete(mut self, result: &FetchOutcome<V, E>, write: WriteParams, latency: Duration) {
        let Some(key) = self.key.take() else {
            return;
        };
        let inner = &self.inner;
        let cache = inner.name();

        let evicted = {
            let mut state = inner.state.lock();
            let settled = state.in_flight.settle(&key, self.id);
            match (result, settled) {
                (Ok(value), Settled::Current) => {
                    tracing::debug!(cache, background = self.background, "fetch settled");
                    inner.write_locked(&mut state, key, value.clone(), write.ttl, write.swr)
                }
                (Ok(_), _) => {
                    tracing::debug!(cache, "discarding result of superseded fetch");
                    false
                }
                (Err(err), _) if self.background => {
                    tracing::warn!(cache, error = %err, "background refresh failed, keeping stale entry");
                    false
                }
                (Err(err), _) => {
                    tracing::debug!(cache, error = %err, "fetch failed");
                    false
                }
            }
        };

        if evicted {
            inner.recorder.evicted();
        }
        inner
            .recorder
            .fetch_settled(self.background, result.is_ok(), latency);
    }
}

impl<K, V, E> Drop for SettleGuard<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        self.inner.state.lock().in_flight.settle(&key, self.id);
        tracing::warn!(cache = self.inner.name(), "fetch aborted before it settled");
        self.inner
            .recorder
            .fetch_settled(self.background, false, Duration::ZERO);
    }
}

impl<K, V, E> RequestCache<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    /// Get the cached value or load it with `fetcher`.
    ///
    /// - If the value is fresh, return it immediately
    /// - If the value is stale and SWR applies, return it and refresh in the background
    /// - If the value is missing or dead, load it, sharing any fetch already
    ///   outstanding for the key
    ///
    /// At most one `fetcher` runs per key at any time. Fetches run as tokio
    /// tasks and complete even if every caller stops waiting. A failed
    /// fetch stores nothing and its error is returned to every caller that
    /// waited on it; a failed background refresh is only logged.
    ///
    /// # Example
    /// ```ignore
    /// let features = cache
    ///     .get_or_set(key, move || load_features(path), GetOrSetOptions::default())
    ///     .await?;
    /// ```
    pub async fn get_or_set<F, Fut>(
        &self,
        key: K,
        fetcher: F,
        options: GetOrSetOptions,
    ) -> Result<V, FetchError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let inner = &self.inner;
        let cache = inner.name();
        let config = &inner.config;
        let swr_enabled = options.swr.unwrap_or(config.enable_swr);
        let write = WriteParams {
            ttl: options.ttl.unwrap_or(config.default_ttl),
            swr: config.swr_window(swr_enabled),
        };

        let (status, resolved) = {
            let mut state = inner.state.lock();
            let lookup = if options.force_refresh {
                Lookup::Absent
            } else {
                state.store.lookup(&key, Instant::now())
            };

            match lookup {
                Lookup::Fresh(value) => {
                    tracing::trace!(cache, "fresh hit");
                    (ReadStatus::Fresh, Resolved::Ready(value))
                }
                Lookup::Stale(value) if swr_enabled => {
                    if state.in_flight.contains(&key) {
                        tracing::trace!(cache, "stale hit, refresh already running");
                    } else {
                        tracing::trace!(cache, "stale hit, refreshing in background");
                        // The channel is dropped; the task settles on its own.
                        drop(self.start_fetch(&mut state, key, fetcher, write, true));
                    }
                    (ReadStatus::Stale, Resolved::Ready(value))
                }
                lookup => {
                    if matches!(lookup, Lookup::Expired) {
                        inner.recorder.expired(1);
                    }
                    let channel = match state.in_flight.attach(&key) {
                        Some(channel) => {
                            tracing::trace!(
                                cache,
                                background = state.in_flight.is_background(&key),
                                "attaching to outstanding fetch"
                            );
                            channel
                        }
                        None => self.start_fetch(&mut state, key, fetcher, write, false),
                    };
                    (ReadStatus::Miss, Resolved::Wait(channel))
                }
            }
        };

        inner.recorder.read(status);
        match resolved {
            Resolved::Ready(value) => Ok(value),
            Resolved::Wait(channel) => channel.await,
        }
    }

    /// Register an in-flight record for `key` and spawn its fetch task.
    ///
    /// Must be called with the lock held and no record present for `key`.
    fn start_fetch<F, Fut>(
        &self,
        state: &mut State<K, V, E>,
        key: K,
        fetcher: F,
        write: WriteParams,
        background: bool,
    ) -> FetchChannel<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (sender, channel) = fetch_channel();
        let id = state.in_flight.register(key.clone(), background, channel.clone());
        self.inner.recorder.fetch_started(background);
        tracing::debug!(cache = self.inner.name(), background, "starting fetch");

        let guard = SettleGuard {
            inner: Arc::clone(&self.inner),
            key: Some(key),
            id,
            background,
        };

        tokio::spawn(async move {
            let started = Instant::now();
            let result = fetcher()
                .await
                .map_err(|err| FetchError::Fetcher(Arc::new(err)));
            // Settle before broadcasting, so that callers arriving after the
            // result either see the written entry or start a new fetch.
            guard.complete(&result, write, started.elapsed());
            sender.send(result).ok();
        });

        channel
    }
}
