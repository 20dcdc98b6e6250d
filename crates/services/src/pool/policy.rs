use crate::random::RandomSource;

/// What to do with an exam's pool before serving a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentDecision {
    /// Pool is below target: generate enough to reach it.
    Fill { count: u32 },
    /// Pool is full and the trial succeeded: append a small random batch.
    Trickle { count: u32 },
    /// Pool is full and the trial failed.
    Skip,
}

impl EnrichmentDecision {
    #[must_use]
    pub fn count(self) -> u32 {
        match self {
            EnrichmentDecision::Fill { count } | EnrichmentDecision::Trickle { count } => count,
            EnrichmentDecision::Skip => 0,
        }
    }

    #[must_use]
    pub fn generates(self) -> bool {
        self.count() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentPolicy {
    target_pool_size: u32,
    probability: f64,
    min_batch: u32,
}

impl EnrichmentPolicy {
    #[must_use]
    pub fn new(target_pool_size: u32, probability: f64, min_batch: u32) -> Self {
        Self {
            target_pool_size,
            probability,
            min_batch: min_batch.max(1),
        }
    }

    #[must_use]
    pub fn target_pool_size(&self) -> u32 {
        self.target_pool_size
    }

    /// Decides enrichment for a pool of `current` questions.
    ///
    /// Below target the pool is filled to the target, or by `requested` when that is larger.
    /// At or above target a Bernoulli trial picks between a batch of `min..=2*min` and nothing.
    pub fn decide(
        &self,
        current: u32,
        requested: Option<u32>,
        rng: &RandomSource,
    ) -> EnrichmentDecision {
        if current < self.target_pool_size {
            let missing = self.target_pool_size - current;
            return EnrichmentDecision::Fill {
                count: missing.max(requested.unwrap_or(0)),
            };
        }
        if rng.bernoulli(self.probability) {
            let count = rng.between(self.min_batch, self.min_batch.saturating_mul(2));
            EnrichmentDecision::Trickle { count }
        } else {
            EnrichmentDecision::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EnrichmentPolicy {
        EnrichmentPolicy::new(100, 0.15, 10)
    }

    #[test]
    fn empty_pool_fills_to_target() {
        let rng = RandomSource::seeded(1);
        assert_eq!(
            policy().decide(0, None, &rng),
            EnrichmentDecision::Fill { count: 100 }
        );
        assert_eq!(
            policy().decide(70, None, &rng),
            EnrichmentDecision::Fill { count: 30 }
        );
    }

    #[test]
    fn larger_request_wins_below_target() {
        let rng = RandomSource::seeded(1);
        assert_eq!(
            policy().decide(95, Some(20), &rng),
            EnrichmentDecision::Fill { count: 20 }
        );
        assert_eq!(
            policy().decide(10, Some(20), &rng),
            EnrichmentDecision::Fill { count: 90 }
        );
    }

    #[test]
    fn full_pool_trickles_within_batch_bounds() {
        let rng = RandomSource::seeded(42);
        let always = EnrichmentPolicy::new(100, 1.0, 10);
        for _ in 0..100 {
            match always.decide(120, Some(500), &rng) {
                EnrichmentDecision::Trickle { count } => assert!((10..=20).contains(&count)),
                other => panic!("unexpected {other:?}"),
            }
        }
        let never = EnrichmentPolicy::new(100, 0.0, 10);
        assert_eq!(never.decide(100, None, &rng), EnrichmentDecision::Skip);
    }

    #[test]
    fn trickle_fraction_tracks_probability() {
        let rng = RandomSource::seeded(2024);
        let trials = 1000;
        let hits = (0..trials)
            .filter(|_| policy().decide(120, None, &rng).generates())
            .count();
        #[allow(clippy::cast_precision_loss)]
        let fraction = hits as f64 / f64::from(trials);
        assert!((fraction - 0.15).abs() < 0.05, "fraction was {fraction}");
    }
}
