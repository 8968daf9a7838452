//! Per-key debounce table.
//!
//! Nothing here owns a timer. Callers pass the current instant in, so the
//! table runs equally well off `tokio::time::Instant::now()` in production and
//! off a paused clock in tests.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// Merges a newer pending value into an older one for the same key.
pub trait Coalesce {
    fn coalesce(self, newer: Self) -> Self;
}

#[derive(Debug)]
struct Scheduled<V> {
    deadline: Instant,
    seq: u64,
    value: V,
}

#[derive(Debug)]
pub struct Debouncer<K, V> {
    delay: Duration,
    pending: HashMap<K, Scheduled<V>>,
    next_seq: u64,
}

impl<K, V> Debouncer<K, V>
where
    K: Eq + Hash + Clone,
    V: Coalesce,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedules `value` under `key`, due `delay` after `now`. A value already
    /// pending for the key is coalesced and its deadline pushed back.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = now + self.delay;

        let value = match self.pending.remove(&key) {
            Some(previous) => previous.value.coalesce(value),
            None => value,
        };
        self.pending.insert(
            key,
            Scheduled {
                deadline,
                seq,
                value,
            },
        );
    }

    /// Removes and returns every entry whose deadline is at or before `now`,
    /// oldest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, s)| s.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        self.take_ordered(due)
    }

    /// Removes and returns everything, oldest deadline first.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let keys: Vec<K> = self.pending.keys().cloned().collect();
        self.take_ordered(keys)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take_ordered(&mut self, keys: Vec<K>) -> Vec<(K, V)> {
        let mut taken: Vec<(K, Scheduled<V>)> = keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|s| (k, s)))
            .collect();
        taken.sort_by_key(|(_, s)| (s.deadline, s.seq));
        taken.into_iter().map(|(k, s)| (k, s.value)).collect()
    }
}
