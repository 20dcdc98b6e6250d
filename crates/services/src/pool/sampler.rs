use std::sync::Arc;

use crate::random::RandomSource;

/// Uniform sampling without replacement.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: Arc<RandomSource>,
}

impl Sampler {
    #[must_use]
    pub fn new(rng: Arc<RandomSource>) -> Self {
        Self { rng }
    }

    /// Returns `size` distinct elements of `pool` in random order, or the whole pool shuffled
    /// when `size >= pool.len()`.
    #[must_use]
    pub fn draw<T: Clone>(&self, pool: &[T], size: usize) -> Vec<T> {
        self.rng
            .distinct_indices(pool.len(), size)
            .into_iter()
            .map(|i| pool[i].clone())
            .collect()
    }
}
