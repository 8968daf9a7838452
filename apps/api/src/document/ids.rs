//! Deterministic id generation for document entries and bullets.
//!
//! Ids are derived from a counter owned by the generator, never from the wall
//! clock or a random source, so replaying the same sequence of edits always
//! yields the same ids.

use serde::{Deserialize, Serialize};

/// Counters at or above this are never adopted from a document, so the
/// generator always has room to advance.
pub const COUNTER_CEILING: u64 = 1 << 53;

/// Counter-based id source. One generator is owned by each editor session and
/// passed explicitly into every mutation that creates nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `"{prefix}-{salt}-{n}"` and advances the counter.
    pub fn next(&mut self, prefix: &str, salt: &str) -> String {
        let id = format!("{prefix}-{salt}-{}", self.counter);
        self.counter = self.counter.saturating_add(1);
        id
    }

    /// Moves the counter forward to at least `floor`; never moves it back.
    /// Used when adopting a document whose ids came from another generator.
    pub fn advance_to(&mut self, floor: u64) {
        self.counter = self.counter.max(floor.min(COUNTER_CEILING));
    }

    /// Only for explicit initialization boundaries (tests, fresh sessions).
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Counter component of an id shaped like the output of `IdGenerator::next`.
/// Any other shape, or a counter at or past `COUNTER_CEILING`, yields `None`.
pub fn counter_of(id: &str) -> Option<u64> {
    let mut parts = id.rsplitn(3, '-');
    let n = parts.next()?;
    let salt = parts.next()?;
    let prefix = parts.next()?;
    if prefix.is_empty() || salt.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    n.parse().ok().filter(|n| *n < COUNTER_CEILING)
}
