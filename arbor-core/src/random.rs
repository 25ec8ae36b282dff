//! Deterministic random source.
//!
//! Every random decision made while growing a tree goes through a
//! [`Random`] stream seeded from the tree seed. The same seed and the same
//! call sequence always reproduce the same values, so the growth engine
//! must draw from a stream in a fixed order.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// A seeded pseudo-random stream.
#[derive(Clone, Debug)]
pub struct Random {
    rng: StdRng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a uniformly distributed value in `[low, high)`.
    ///
    /// Always consumes exactly one draw from the stream, even when
    /// `low == high`.
    #[inline]
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.rng.random::<f64>()
    }

    /// Returns a jittered value in `[-max, max)`.
    ///
    /// This is the variation helper used for every `...V` parameter:
    /// `length + var(length_v)` and so on. `var(0.0)` is exactly `0.0`.
    #[inline]
    pub fn var(&mut self, max: f64) -> f64 {
        self.uniform(-max, max)
    }
}

/// Derives an independent seed for sub-stream `stream` of `seed`.
///
/// SplitMix64 finalizer; distinct streams of one seed do not overlap in
/// practice, and the mapping never changes between releases.
pub fn mix_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
