//! Question pool: enrichment policy, sampling and the service that ties them to storage.

mod policy;
mod sampler;
mod service;

pub use policy::{EnrichmentDecision, EnrichmentPolicy};
pub use sampler::Sampler;
pub use service::{EnrichOptions, EnrichmentReport, ExamSummary, PoolService, SampledQuestions};
