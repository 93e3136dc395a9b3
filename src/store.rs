use std::hash::Hash;

use indexmap::IndexMap;
use tokio::time::Instant;

use crate::entry::{Entry, Freshness};

/// Result of looking up a key at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup<V> {
    Fresh(V),
    Stale(V),
    /// The entry was dead and has been removed.
    Expired,
    Absent,
}

/// Key to entry mapping that remembers insertion order.
///
/// The order is used for FIFO eviction only. Overwriting an existing key keeps
/// its position, reads never reorder anything.
///
/// This type does no synchronization of its own, the owning cache guards it.
#[derive(Debug)]
pub(crate) struct EntryStore<K, V> {
    entries: IndexMap<K, Entry<V>>,
    max_entries: Option<usize>,
}

impl<K, V> EntryStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(max_entries: Option<usize>) -> Self {
        EntryStore {
            entries: IndexMap::new(),
            max_entries,
        }
    }

    /// Classify the entry for `key`, eagerly removing it if it is dead.
    pub fn lookup(&mut self, key: &K, now: Instant) -> Lookup<V> {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Absent;
        };

        match entry.freshness(now) {
            Freshness::Fresh => Lookup::Fresh(entry.value.clone()),
            Freshness::Stale => Lookup::Stale(entry.value.clone()),
            Freshness::Dead => {
                self.entries.shift_remove(key);
                Lookup::Expired
            }
        }
    }

    /// Write `entry` for `key`.
    ///
    /// Returns the key that had to be evicted to make room, if any.
    pub fn insert(&mut self, key: K, entry: Entry<V>) -> Option<K> {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
            return None;
        }

        let evicted = match self.max_entries {
            Some(max) if self.entries.len() >= max => {
                self.entries.shift_remove_index(0).map(|(key, _)| key)
            }
            _ => None,
        };

        self.entries.insert(key, entry);
        evicted
    }

    /// Classify the entry for `key` without removing it.
    pub fn freshness(&self, key: &K, now: Instant) -> Option<Freshness> {
        self.entries.get(key).map(|entry| entry.freshness(now))
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All stored keys in insertion order, including expired ones not yet removed.
    pub fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    /// Remove every dead entry. Stale entries survive.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_dead(now));
        before - self.entries.len()
    }

    /// Remove every entry whose key matches `predicate`, returning the removed keys.
    pub fn remove_matching<P>(&mut self, mut predicate: P) -> Vec<K>
    where
        P: FnMut(&K) -> bool,
    {
        let mut removed = Vec::new();
        self.entries.retain(|key, _| {
            if predicate(key) {
                removed.push(key.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}
