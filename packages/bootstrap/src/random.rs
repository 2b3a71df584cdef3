//! Injectable random sources for bootstrap iterations.
//!
//! Every iteration gets its own generator derived from `(seed, iteration)`,
//! so a run produces the same result no matter how iterations are spread
//! across threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Supplies one independent generator per bootstrap iteration.
pub trait RandomSource: Sync {
    /// Generator for `iteration`. Repeated calls return the same stream.
    fn iteration_rng(&self, iteration: usize) -> StdRng;
}

/// Deterministic source keyed by a 64-bit seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededRandom {
    seed: u64,
}

impl SeededRandom {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Picks a fresh seed from the thread generator. Log [`Self::seed`] to
    /// be able to reproduce the run.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random())
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn iteration_rng(&self, iteration: usize) -> StdRng {
        let mut key = [0_u8; 32];
        key[..8].copy_from_slice(&self.seed.to_le_bytes());
        key[8..16].copy_from_slice(&(iteration as u64).to_le_bytes());
        StdRng::from_seed(key)
    }
}
