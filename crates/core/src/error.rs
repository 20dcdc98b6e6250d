use thiserror::Error;

use crate::model::{ExamError, QuestionError, ReviewError};
use crate::session::SessionActionError;

/// Umbrella error for callers that handle every domain failure the same way.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Session(#[from] SessionActionError),
}
