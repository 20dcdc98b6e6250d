use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ENRICHMENT_PROBABILITY: f64 = 0.15;
pub const DEFAULT_MIN_ENRICHMENT_BATCH: u32 = 10;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SAMPLE_SIZE: u32 = 50;

/// Knobs of the pool enrichment policy and sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSettings {
    enrichment_probability: f64,
    min_enrichment_batch: u32,
    target_pool_size: Option<u32>,
    generation_timeout: Duration,
    default_sample_size: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            enrichment_probability: DEFAULT_ENRICHMENT_PROBABILITY,
            min_enrichment_batch: DEFAULT_MIN_ENRICHMENT_BATCH,
            target_pool_size: None,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            default_sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl PoolSettings {
    /// `target_pool_size` overrides every exam's own target when set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the probability is outside `[0, 1]` or any size or the timeout is
    /// zero.
    pub fn new(
        enrichment_probability: f64,
        min_enrichment_batch: u32,
        target_pool_size: Option<u32>,
        generation_timeout: Duration,
        default_sample_size: u32,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&enrichment_probability) {
            return Err(ConfigError::InvalidProbability(enrichment_probability));
        }
        if min_enrichment_batch == 0 {
            return Err(ConfigError::InvalidBatch);
        }
        if target_pool_size == Some(0) {
            return Err(ConfigError::InvalidTargetPoolSize);
        }
        if generation_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if default_sample_size == 0 {
            return Err(ConfigError::InvalidSampleSize);
        }
        Ok(Self {
            enrichment_probability,
            min_enrichment_batch,
            target_pool_size,
            generation_timeout,
            default_sample_size,
        })
    }

    #[must_use]
    pub fn enrichment_probability(&self) -> f64 {
        self.enrichment_probability
    }

    #[must_use]
    pub fn min_enrichment_batch(&self) -> u32 {
        self.min_enrichment_batch
    }

    #[must_use]
    pub fn target_pool_size(&self) -> Option<u32> {
        self.target_pool_size
    }

    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        self.generation_timeout
    }

    #[must_use]
    pub fn default_sample_size(&self) -> u32 {
        self.default_sample_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = PoolSettings::default();
        assert!((s.enrichment_probability() - 0.15).abs() < f64::EPSILON);
        assert_eq!(s.min_enrichment_batch(), 10);
        assert_eq!(s.generation_timeout(), Duration::from_secs(60));
        assert_eq!(s.default_sample_size(), 50);
        assert_eq!(s.target_pool_size(), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let timeout = Duration::from_secs(60);
        assert_eq!(
            PoolSettings::new(1.5, 10, None, timeout, 50),
            Err(ConfigError::InvalidProbability(1.5))
        );
        assert_eq!(
            PoolSettings::new(0.15, 0, None, timeout, 50),
            Err(ConfigError::InvalidBatch)
        );
        assert_eq!(
            PoolSettings::new(0.15, 10, Some(0), timeout, 50),
            Err(ConfigError::InvalidTargetPoolSize)
        );
        assert_eq!(
            PoolSettings::new(0.15, 10, None, Duration::ZERO, 50),
            Err(ConfigError::InvalidTimeout)
        );
        assert!(PoolSettings::new(0.0, 1, Some(1), timeout, 1).is_ok());
    }
}
