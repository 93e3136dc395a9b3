use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use crate::error::CacheError;

/// Configuration for a [`RequestCache`](crate::RequestCache).
///
/// Durations deserialize from human readable strings such as `"30s"` or `"5m"`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live applied when a write does not carry its own.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Serve stale entries while they are refreshed in the background.
    ///
    /// Individual `get_or_set` calls may override this.
    pub enable_swr: bool,

    /// How long past its TTL an entry may still be served when SWR applies.
    #[serde(with = "humantime_serde")]
    pub swr_ttl: Duration,

    /// Upper bound on the number of entries. `None` means unbounded.
    ///
    /// Once reached, inserting a new key evicts the oldest inserted one.
    pub max_entries: Option<usize>,

    /// Interval of the background sweep that drops dead entries.
    /// `None` disables the sweeper; reads still clean up lazily.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            default_ttl: Duration::from_secs(300),
            enable_swr: false,
            swr_ttl: Duration::from_secs(60),
            max_entries: None,
            cleanup_interval: None,
        }
    }
}

impl CacheConfig {
    /// Reject configurations the cache cannot honor.
    ///
    /// TTLs too large to be represented as a deadline are accepted; entries
    /// written with them never expire.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.default_ttl.is_zero() {
            return Err(CacheError::invalid_config(
                "default_ttl must be greater than zero",
            ));
        }
        if self.enable_swr && self.swr_ttl.is_zero() {
            return Err(CacheError::invalid_config(
                "swr_ttl must be greater than zero when SWR is enabled",
            ));
        }
        if self.max_entries == Some(0) {
            return Err(CacheError::invalid_config(
                "max_entries must be greater than zero",
            ));
        }
        if let Some(interval) = self.cleanup_interval {
            if interval.is_zero() {
                return Err(CacheError::invalid_config(
                    "cleanup_interval must be greater than zero",
                ));
            }
            if Instant::now().checked_add(interval).is_none() {
                return Err(CacheError::invalid_config(
                    "cleanup_interval is too large to be scheduled",
                ));
            }
        }
        Ok(())
    }

    /// The SWR window stamped on an entry written with SWR `enabled` or not.
    pub(crate) fn swr_window(&self, enabled: bool) -> Duration {
        if enabled {
            self.swr_ttl
        } else {
            Duration::ZERO
        }
    }
}
