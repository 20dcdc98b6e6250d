use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExamId, ReviewId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReviewError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("review comment cannot be empty")]
    EmptyComment,

    #[error("reviewer id cannot be empty")]
    MissingUser,

    #[error("exam score must be a percentage, got {0}")]
    InvalidScore(u8),
}

/// Feedback a user leaves after finishing an exam. One per user and exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub exam_id: ExamId,
    pub user_uid: String,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub exam_score: Option<u8>,
    #[serde(default)]
    pub passed: Option<bool>,
}

impl ReviewDraft {
    /// # Errors
    ///
    /// Returns `ReviewError` when the rating is outside 1..=5, the comment or user id is blank,
    /// or the attached score is above 100.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedReview, ReviewError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ReviewError::InvalidRating(self.rating));
        }
        let user_uid = self.user_uid.trim().to_owned();
        if user_uid.is_empty() {
            return Err(ReviewError::MissingUser);
        }
        let comment = self.comment.trim().to_owned();
        if comment.is_empty() {
            return Err(ReviewError::EmptyComment);
        }
        if let Some(score) = self.exam_score.filter(|s| *s > 100) {
            return Err(ReviewError::InvalidScore(score));
        }

        Ok(ValidatedReview {
            exam_id: self.exam_id,
            user_uid,
            user_name: self.user_name.trim().to_owned(),
            rating: self.rating,
            comment,
            exam_score: self.exam_score,
            passed: self.passed,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReview {
    pub exam_id: ExamId,
    pub user_uid: String,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub exam_score: Option<u8>,
    pub passed: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedReview {
    #[must_use]
    pub fn assign_id(self, id: ReviewId) -> Review {
        Review { id, inner: self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    id: ReviewId,
    inner: ValidatedReview,
}

impl Review {
    #[must_use]
    pub fn id(&self) -> ReviewId {
        self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.inner.exam_id
    }

    #[must_use]
    pub fn user_uid(&self) -> &str {
        &self.inner.user_uid
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.inner.user_name
    }

    #[must_use]
    pub fn rating(&self) -> u8 {
        self.inner.rating
    }

    #[must_use]
    pub fn comment(&self) -> &str {
        &self.inner.comment
    }

    #[must_use]
    pub fn exam_score(&self) -> Option<u8> {
        self.inner.exam_score
    }

    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.inner.passed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }
}
