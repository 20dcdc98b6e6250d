use async_trait::async_trait;

use certprep_core::model::{ExamId, ExamType, Question, ReviewDraft};

use crate::api::{
    ExamView, GenerateQuestionsRequest, GenerateQuestionsResponse, PreGenerateRequest,
    ReviewView,
};
use crate::error::BackendError;
use crate::pool::{EnrichOptions, PoolService};
use crate::review_service::ExamReviewService;

/// Questions drawn for a session plus the pool size they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnQuestions {
    pub questions: Vec<Question>,
    pub pool_size: u32,
}

/// Everything the session controller needs from the pool-management side.
#[async_trait]
pub trait ExamBackend: Send + Sync {
    async fn exam_by_type(&self, exam_type: &ExamType) -> Result<ExamView, BackendError>;

    async fn generate_questions(
        &self,
        exam_id: ExamId,
        request: &GenerateQuestionsRequest,
    ) -> Result<GenerateQuestionsResponse, BackendError>;

    async fn random_questions(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<DrawnQuestions, BackendError>;

    /// Starts background enrichment and returns without waiting for it.
    async fn pre_generate(&self, request: &PreGenerateRequest) -> Result<(), BackendError>;

    async fn submit_review(&self, draft: ReviewDraft) -> Result<ReviewView, BackendError>;
}

/// In-process backend calling the services directly.
#[derive(Clone)]
pub struct LocalBackend {
    pool: PoolService,
    reviews: ExamReviewService,
}

impl LocalBackend {
    #[must_use]
    pub fn new(pool: PoolService, reviews: ExamReviewService) -> Self {
        Self { pool, reviews }
    }
}

#[async_trait]
impl ExamBackend for LocalBackend {
    async fn exam_by_type(&self, exam_type: &ExamType) -> Result<ExamView, BackendError> {
        let summary = self.pool.exam_by_type(exam_type).await?;
        Ok(ExamView::from(&summary))
    }

    async fn generate_questions(
        &self,
        exam_id: ExamId,
        request: &GenerateQuestionsRequest,
    ) -> Result<GenerateQuestionsResponse, BackendError> {
        let summary = self.pool.exam(exam_id).await?;
        let report = self
            .pool
            .enrich(&summary.exam, enrich_options(request))
            .await?;
        Ok(GenerateQuestionsResponse::from(&report))
    }

    async fn random_questions(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<DrawnQuestions, BackendError> {
        let sample = self.pool.sample(exam_id, Some(limit)).await?;
        Ok(DrawnQuestions {
            questions: sample.questions,
            pool_size: sample.pool_size,
        })
    }

    async fn pre_generate(&self, request: &PreGenerateRequest) -> Result<(), BackendError> {
        self.pool
            .pre_generate(&request.exam_type, request.num_questions)
            .await?;
        Ok(())
    }

    async fn submit_review(&self, draft: ReviewDraft) -> Result<ReviewView, BackendError> {
        let review = self.reviews.submit(draft).await?;
        Ok(ReviewView::from(&review))
    }
}

/// Maps the wire request onto pool options. The external provider is on unless switched off.
#[must_use]
pub fn enrich_options(request: &GenerateQuestionsRequest) -> EnrichOptions {
    EnrichOptions {
        requested: request.num_questions,
        domain: request.domain.clone(),
        use_external_provider: request.use_external_provider.unwrap_or(true),
    }
}
