//! Guards for overlapping asynchronous requests.
//!
//! There is no locking of remote state here: these only decide which local response wins and
//! whether a submission may start while another one is still in flight.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

// Guards are only taken for bookkeeping and never held across an `.await`.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug)]
struct FetchState<K> {
    generation: u64,
    key: Option<K>,
    closed: bool,
}

/// Tracks the most recently started fetch so late responses can be discarded.
#[derive(Debug)]
pub struct LatestFetch<K> {
    state: Mutex<FetchState<K>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket<K> {
    generation: u64,
    key: K,
}

impl<K> FetchTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Clone + PartialEq> LatestFetch<K> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FetchState {
                generation: 0,
                key: None,
                closed: false,
            }),
        }
    }

    /// Starts a fetch for `key`, superseding every earlier ticket.
    pub fn begin(&self, key: K) -> FetchTicket<K> {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.key = Some(key.clone());
        FetchTicket {
            generation: state.generation,
            key,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket<K>) -> bool {
        let state = lock(&self.state);
        let current = !state.closed
            && state.generation == ticket.generation
            && state.key.as_ref() == Some(&ticket.key);
        if !current {
            debug!(generation = ticket.generation, "Discarding stale fetch result");
        }
        current
    }

    /// Invalidates every outstanding ticket; later results are ignored.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.generation += 1;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

impl<K: Clone + PartialEq> Default for LatestFetch<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys whose submission is currently running.
#[derive(Debug)]
pub struct InFlight<K: Eq + Hash> {
    active: Arc<Mutex<HashSet<K>>>,
}

/// Released when dropped.
#[derive(Debug)]
pub struct InFlightPermit<K: Eq + Hash> {
    key: Option<K>,
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// `None` while another permit for `key` is alive.
    pub fn try_acquire(&self, key: K) -> Option<InFlightPermit<K>> {
        let mut active = lock(&self.active);
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightPermit {
            key: Some(key),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, key: &K) -> bool {
        lock(&self.active).contains(key)
    }
}

impl<K: Eq + Hash + Clone> Default for InFlight<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Drop for InFlightPermit<K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.active).remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_begun_fetch_wins() {
        let tracker = LatestFetch::new();
        let first = tracker.begin("2026-10-18");
        let second = tracker.begin("2026-10-25");

        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn same_key_refetch_supersedes_older_ticket() {
        let tracker = LatestFetch::new();
        let first = tracker.begin(1);
        let second = tracker.begin(1);
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn close_invalidates_outstanding_tickets() {
        let tracker = LatestFetch::new();
        let ticket = tracker.begin(1);
        tracker.close();
        assert!(tracker.is_closed());
        assert!(!tracker.is_current(&ticket));
        let late = tracker.begin(2);
        assert!(!tracker.is_current(&late));
    }

    #[test]
    fn permit_blocks_until_dropped() {
        let guard = InFlight::new();
        let permit = guard.try_acquire("session-a").unwrap();

        assert!(guard.try_acquire("session-a").is_none());
        assert!(guard.try_acquire("session-b").is_some());
        assert!(guard.is_active(&"session-a"));

        drop(permit);
        assert!(!guard.is_active(&"session-a"));
        assert!(guard.try_acquire("session-a").is_some());
    }
}
