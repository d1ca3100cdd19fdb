//! Owned, forkable random streams.
//!
//! Every organism carries its own [`RandomSource`] and the simulation keeps one
//! for field regeneration and spontaneous spawning. Nothing in the core touches
//! a process-wide generator, so a run is a pure function of its seed.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How descendant streams are derived from a parent stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkMode {
    /// Each descendant is reseeded from fresh parent draws
    #[default]
    Independent,
    /// Each descendant is an exact copy of the parent state (legacy behaviour:
    /// siblings replay the same sequence)
    Clone,
}

/// Seeded pseudorandom stream
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: ChaCha8Rng,
    mode: ForkMode,
}

impl RandomSource {
    /// Create a stream from a seed
    pub fn new(seed: u64) -> Self {
        Self::with_mode(seed, ForkMode::default())
    }

    pub fn with_mode(seed: u64, mode: ForkMode) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            mode,
        }
    }

    #[inline]
    pub fn mode(&self) -> ForkMode {
        self.mode
    }

    /// Uniform real in `[0, 1)`; never returns exactly 1
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform real in `[min, max)`
    #[inline]
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        if min < max {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Uniform integer in `[min, max)`
    #[inline]
    pub fn int_range(&mut self, min: usize, max: usize) -> usize {
        assert!(min < max, "empty integer range [{}, {})", min, max);
        self.rng.gen_range(min..max)
    }

    /// Exponential inter-arrival time for a Poisson process with rate `lambda`
    #[inline]
    pub fn exponential(&mut self, lambda: f64) -> f64 {
        -(1.0 - self.unit()).ln() / lambda
    }

    /// Derive one descendant stream
    pub fn fork(&mut self) -> RandomSource {
        match self.mode {
            ForkMode::Independent => Self::with_mode(self.rng.next_u64(), self.mode),
            ForkMode::Clone => self.clone(),
        }
    }

    /// Derive two descendant streams
    pub fn fork_pair(&mut self) -> (RandomSource, RandomSource) {
        let first = self.fork();
        let second = self.fork();
        (first, second)
    }
}
