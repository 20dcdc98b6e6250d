#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generation;
pub mod import_service;
pub mod pool;
pub mod random;
pub mod review_service;
pub mod sessions;

pub use certprep_core::Clock;

pub use app_services::{AppServices, ServiceSettings};
pub use config::PoolSettings;
pub use error::{
    AppServicesError, BackendError, ConfigError, ControllerError, GeneratorError, ImportError,
    PoolError, ReviewServiceError,
};
pub use generation::{FallbackGenerator, GenerationRequest, QuestionGenerator, RawQuestion};
pub use import_service::{ImportReport, ImportService};
pub use pool::{EnrichOptions, EnrichmentDecision, EnrichmentPolicy, PoolService, Sampler};
pub use random::RandomSource;
pub use review_service::ExamReviewService;
pub use sessions::{
    ExamBackend, ExamSessionController, HttpBackend, LocalBackend, SessionSettings, SessionView,
};
