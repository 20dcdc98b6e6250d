use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use certprep_core::model::ExamError;
use services::api::{
    CODE_CONFLICT, CODE_CONTENT_UNAVAILABLE, CODE_INTERNAL, CODE_INVALID, CODE_NOT_FOUND,
    ErrorBody,
};
use services::{PoolError, ReviewServiceError};

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Review(#[from] ReviewServiceError),

    #[error(transparent)]
    InvalidExamType(#[from] ExamError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Pool(PoolError::ExamNotFound(_) | PoolError::UnknownExamType(_))
            | Self::Review(ReviewServiceError::ExamNotFound(_)) => {
                (StatusCode::NOT_FOUND, CODE_NOT_FOUND)
            }
            Self::Pool(PoolError::ContentUnavailable { .. }) => {
                (StatusCode::NOT_FOUND, CODE_CONTENT_UNAVAILABLE)
            }
            Self::Pool(PoolError::ZeroLimit)
            | Self::Review(ReviewServiceError::Review(_))
            | Self::InvalidExamType(_) => {
                (StatusCode::BAD_REQUEST, CODE_INVALID)
            }
            Self::Review(ReviewServiceError::AlreadyReviewed) => {
                (StatusCode::CONFLICT, CODE_CONFLICT)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: code.to_owned(),
        };
        (status, Json(body)).into_response()
    }
}
