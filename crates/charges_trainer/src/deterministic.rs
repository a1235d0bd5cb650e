//! Deterministic utilities for reproducible training
//!
//! Provides an LCG-based RNG, a seeded Fisher–Yates permutation, and the
//! tie-breaking order for split selection, so that identical inputs produce
//! identical splits and models on every platform.

use std::num::Wrapping;

/// Seed for the train/holdout shuffle
pub const SPLIT_SEED: i64 = 42;

/// Share of rows withheld for evaluation
pub const HOLDOUT_PERCENT: usize = 20;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses the glibc `rand()` constants
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        Self {
            state: Wrapping(seed.rem_euclid(Self::MODULUS)),
        }
    }

    /// Next value in `[0, MODULUS)`
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Next value in `[0, max)`
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_i64() as u64 % max as u64) as usize
    }
}

/// Seeded permutation of `0..n`
pub fn shuffled_indices(n: usize, seed: i64) -> Vec<usize> {
    let mut rng = LcgRng::new(seed);
    let mut indices: Vec<usize> = (0..n).collect();

    for i in (1..n).rev() {
        let j = rng.next_range(i + 1);
        indices.swap(i, j);
    }

    indices
}

/// Holdout size for `n` rows: `ceil(n * HOLDOUT_PERCENT / 100)`
pub fn holdout_len(n: usize, percent: usize) -> usize {
    (n * percent).div_ceil(100)
}

/// Deterministic tie-breaker for split selection
/// Lower `(feature_idx, threshold)` wins among equal gains
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }
}
