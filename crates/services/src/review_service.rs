use std::sync::Arc;

use certprep_core::Clock;
use certprep_core::model::{ExamId, Review, ReviewDraft};
use storage::repository::{ExamRepository, ReviewRepository};
use tracing::info;

use crate::error::ReviewServiceError;

/// Default number of reviews returned by `list`.
pub const DEFAULT_REVIEW_LIMIT: u32 = 20;

/// Collects the feedback users leave after finishing an exam.
#[derive(Clone)]
pub struct ExamReviewService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl ExamReviewService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        reviews: Arc<dyn ReviewRepository>,
    ) -> Self {
        Self {
            clock,
            exams,
            reviews,
        }
    }

    /// Validates and stores a review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Review` for invalid input, `ExamNotFound` for unknown
    /// exams, and `AlreadyReviewed` when the user already reviewed this exam.
    pub async fn submit(&self, draft: ReviewDraft) -> Result<Review, ReviewServiceError> {
        if self.exams.get_exam(draft.exam_id).await?.is_none() {
            return Err(ReviewServiceError::ExamNotFound(draft.exam_id));
        }
        let validated = draft.validate(self.clock.now())?;
        let review = self.reviews.append_review(validated).await?;
        info!(exam_id = %review.exam_id(), rating = review.rating(), "review stored");
        Ok(review)
    }

    /// Newest reviews first.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Storage` on repository failures.
    pub async fn list(
        &self,
        exam_id: ExamId,
        limit: Option<u32>,
    ) -> Result<Vec<Review>, ReviewServiceError> {
        let limit = limit.unwrap_or(DEFAULT_REVIEW_LIMIT);
        Ok(self.reviews.list_reviews(exam_id, limit).await?)
    }
}
