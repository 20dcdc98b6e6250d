use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shared source of randomness for the enrichment trial, batch sizing and sampling.
///
/// Production seeds from the OS; tests pass a fixed seed for reproducible draws.
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl RandomSource {
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// True with probability `p`, clamped into `[0, 1]`.
    pub fn bernoulli(&self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.with_rng(|rng| rng.random_bool(p))
    }

    /// Uniform integer in `low..=high`.
    pub fn between(&self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.with_rng(|rng| rng.random_range(low..=high))
    }

    /// `amount` distinct indices below `len`, in random order. Capped at `len`.
    pub fn distinct_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        self.with_rng(|rng| rand::seq::index::sample(rng, len, amount).into_vec())
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
