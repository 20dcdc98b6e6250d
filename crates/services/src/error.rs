//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use certprep_core::certification::CertificateDecision;
use certprep_core::model::{ExamError, ExamId, ExamType, QuestionError, ReviewError};
use certprep_core::session::SessionActionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Invalid runtime settings.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("enrichment probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),
    #[error("minimum enrichment batch must be at least 1")]
    InvalidBatch,
    #[error("target pool size must be at least 1")]
    InvalidTargetPoolSize,
    #[error("sample size must be at least 1")]
    InvalidSampleSize,
    #[error("generation timeout must be longer than zero")]
    InvalidTimeout,
}

/// Errors emitted by question generators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("no question generator is configured")]
    NotConfigured,
    #[error("question generator returned an empty response")]
    EmptyResponse,
    #[error("question generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("question generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not parse generated questions: {0}")]
    Parse(String),
}

/// Errors emitted by `PoolService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("no exam of type {0}")]
    UnknownExamType(ExamType),
    #[error("no questions available for exam {exam_id}")]
    ContentUnavailable { exam_id: ExamId },
    #[error("sample limit must be at least 1")]
    ZeroLimit,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ImportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("could not read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("import file is not a question array: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no exam of type {0}")]
    UnknownExamType(ExamType),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExamReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("this exam was already reviewed by the user")]
    AlreadyReviewed,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ReviewServiceError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict => Self::AlreadyReviewed,
            other => Self::Storage(other),
        }
    }
}

/// Errors surfaced by an `ExamBackend`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no questions available")]
    ContentUnavailable,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Pool(PoolError),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<PoolError> for BackendError {
    fn from(value: PoolError) -> Self {
        match value {
            PoolError::ContentUnavailable { .. } => Self::ContentUnavailable,
            PoolError::ExamNotFound(id) => Self::NotFound(format!("exam {id}")),
            PoolError::UnknownExamType(t) => Self::NotFound(format!("exam type {t}")),
            PoolError::ZeroLimit => Self::Rejected(PoolError::ZeroLimit.to_string()),
            other => Self::Pool(other),
        }
    }
}

/// Errors emitted by `ExamSessionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error(transparent)]
    Action(#[from] SessionActionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no attempt to review")]
    NothingToReview,
    #[error("certificate not available: {0:?}")]
    NotEligible(CertificateDecision),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
