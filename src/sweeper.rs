//! Periodic removal of dead entries.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::Inner;
use crate::error::CacheError;

/// Spawn a task that sweeps the cache every `interval`.
///
/// The task only holds a weak reference, so it ends on its own once the
/// last cache handle is dropped. [`dispose`](crate::RequestCache::dispose)
/// aborts it explicitly.
pub(crate) fn spawn<K, V, E>(
    inner: Weak<Inner<K, V, E>>,
    interval: Duration,
) -> Result<JoinHandle<()>, CacheError>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let handle = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
    // The first tick of a plain `interval` completes immediately.
    let start = Instant::now()
        .checked_add(interval)
        .ok_or_else(|| CacheError::invalid_config("cleanup_interval is too large to be scheduled"))?;

    Ok(handle.spawn(async move {
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.sweep();
        }
    }))
}
