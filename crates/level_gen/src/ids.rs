//! Explicit id sequences.
//!
//! Rooms, clusters, walkers and generated items draw their ids from an [`IdSequence`]
//! owned by the generation context instead of process-wide counters.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Monotonic `u64` id generator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Creates a sequence whose first id is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self { next: start }
    }

    /// Returns the next id and advances the sequence.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Returns the id the next call to [`IdSequence::next_id`] will hand out.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
