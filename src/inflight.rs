use std::collections::HashMap;
use std::hash::Hash;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::error::FetchError;

/// What every caller attached to a fetch eventually observes.
pub(crate) type FetchOutcome<V, E> = Result<V, FetchError<E>>;

/// A clonable handle on the eventual outcome of a fetch.
pub(crate) type FetchChannel<V, E> = Shared<BoxFuture<'static, FetchOutcome<V, E>>>;

/// Creates the sending half for a fetch task and the channel callers await.
///
/// If the sender is dropped without sending (the task panicked or was
/// cancelled), callers resolve to [`FetchError::Aborted`].
pub(crate) fn fetch_channel<V, E>() -> (oneshot::Sender<FetchOutcome<V, E>>, FetchChannel<V, E>)
where
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let channel = receiver
        .map(|received| received.unwrap_or(Err(FetchError::Aborted)))
        .boxed()
        .shared();
    (sender, channel)
}

/// An outstanding fetch for one key.
struct InFlight<V, E> {
    id: u64,
    background: bool,
    /// Set when the key was explicitly mutated after the fetch started; the
    /// outcome is still broadcast but must not be written back.
    superseded: bool,
    channel: FetchChannel<V, E>,
}

/// What a fetch found when it came to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
    /// The record was current; its result may be written.
    Current,
    /// The record was superseded by an explicit mutation.
    Superseded,
    /// No record with this id exists anymore.
    Missing,
}

/// Tracks at most one outstanding fetch per key.
pub(crate) struct InFlightTable<K, V, E> {
    records: HashMap<K, InFlight<V, E>>,
    next_id: u64,
}

impl<K, V, E> InFlightTable<K, V, E>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        InFlightTable {
            records: HashMap::new(),
            next_id: 0,
        }
    }

    /// The channel of the fetch outstanding for `key`, if any.
    pub fn attach(&self, key: &K) -> Option<FetchChannel<V, E>> {
        self.records.get(key).map(|record| record.channel.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.records.contains_key(key)
    }

    pub fn is_background(&self, key: &K) -> bool {
        self.records.get(key).is_some_and(|record| record.background)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Register a new fetch for `key`, returning its id.
    ///
    /// Callers must have checked [`attach`](Self::attach) under the same lock.
    pub fn register(&mut self, key: K, background: bool, channel: FetchChannel<V, E>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let previous = self.records.insert(
            key,
            InFlight {
                id,
                background,
                superseded: false,
                channel,
            },
        );
        debug_assert!(previous.is_none(), "registered a second fetch for a key");
        id
    }

    /// Remove the record `id` for `key`, reporting whether its result is still wanted.
    pub fn settle(&mut self, key: &K, id: u64) -> Settled {
        match self.records.get(key) {
            Some(record) if record.id == id => {
                let superseded = record.superseded;
                self.records.remove(key);
                if superseded {
                    Settled::Superseded
                } else {
                    Settled::Current
                }
            }
            _ => Settled::Missing,
        }
    }

    pub fn supersede(&mut self, key: &K) {
        if let Some(record) = self.records.get_mut(key) {
            record.superseded = true;
        }
    }

    pub fn supersede_matching<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&K) -> bool,
    {
        for (key, record) in self.records.iter_mut() {
            if predicate(key) {
                record.superseded = true;
            }
        }
    }

    pub fn supersede_all(&mut self) {
        self.supersede_matching(|_| true);
    }
}
