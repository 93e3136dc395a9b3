use std::time::Duration;

use tokio::time::Instant;

/// How usable an entry is at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Within its TTL; served without a refresh.
    Fresh,
    /// Past its TTL but inside the stale-while-revalidate window.
    Stale,
    /// Past TTL and SWR window. Must not be served.
    Dead,
}

/// A cache entry containing a value and its expiration windows.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The cached value.
    pub value: V,

    /// When the value was written.
    pub created_at: Instant,

    /// Before `created_at + ttl` the entry is considered fresh.
    pub ttl: Duration,

    /// Additional window after the TTL during which the entry may be served
    /// while it is refreshed. Zero when SWR did not apply to the write.
    pub swr: Duration,
}

impl<V> Entry<V> {
    /// Create a new cache entry.
    pub fn new(value: V, created_at: Instant, ttl: Duration, swr: Duration) -> Self {
        Entry {
            value,
            created_at,
            ttl,
            swr,
        }
    }

    /// The instant at which the entry stops being fresh.
    ///
    /// `None` when the deadline is not representable; such an entry never expires.
    pub fn fresh_until(&self) -> Option<Instant> {
        self.created_at.checked_add(self.ttl)
    }

    /// The instant at which the entry must no longer be used.
    ///
    /// `None` when the deadline is not representable.
    pub fn stale_until(&self) -> Option<Instant> {
        self.fresh_until()?.checked_add(self.swr)
    }

    /// Classify the entry relative to `now`.
    pub fn freshness(&self, now: Instant) -> Freshness {
        if self.fresh_until().is_none_or(|until| now < until) {
            Freshness::Fresh
        } else if self.stale_until().is_none_or(|until| now < until) {
            Freshness::Stale
        } else {
            Freshness::Dead
        }
    }

    /// Check if the entry has expired and should not be used.
    pub fn is_dead(&self, now: Instant) -> bool {
        self.freshness(now) == Freshness::Dead
    }
}
