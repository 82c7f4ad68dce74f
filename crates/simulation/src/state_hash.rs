//! Deterministic state hashing for replay verification.
//!
//! Computes a 64-bit hash of an episode's state. The hash is computed in a
//! fixed order over:
//!
//! 1. Tick counter
//! 2. Green axis and ticks since phase start
//! 3. Queue lengths (N, S, E, W)
//! 4. Cumulative waits (f64 -> bits)
//! 5. Cumulative reward (f64 -> bits) and vehicles served
//! 6. SimRng keystream position
//!
//! Error messages and failure counters are excluded, so a replay driven by
//! the recorded axes hashes the same as the live run it came from.

use std::hash::{Hash, Hasher};

use crate::episode::EpisodeState;
use crate::sim_rng::SimRng;

// ---------------------------------------------------------------------------
// FNV-1a hasher (deterministic, no random seed)
// ---------------------------------------------------------------------------

/// A simple FNV-1a hasher that produces deterministic output regardless of
/// platform or Rust version. Unlike `DefaultHasher`, this is not randomized.
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001B3;

    fn new() -> Self {
        Self {
            state: Self::FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::FNV_PRIME);
        }
    }
}

pub fn compute_state_hash(state: &EpisodeState, rng: &SimRng) -> u64 {
    let mut hasher = Fnv1aHasher::new();

    state.tick.hash(&mut hasher);

    state.phase.green.hash(&mut hasher);
    state.phase.ticks_since_phase_start.hash(&mut hasher);

    for len in state.queues.lengths() {
        len.hash(&mut hasher);
    }

    state.fairness.cum_wait_ew.to_bits().hash(&mut hasher);
    state.fairness.cum_wait_ns.to_bits().hash(&mut hasher);

    state.cumulative_reward.to_bits().hash(&mut hasher);
    state.total_served.hash(&mut hasher);

    rng.word_pos().hash(&mut hasher);

    hasher.finish()
}
