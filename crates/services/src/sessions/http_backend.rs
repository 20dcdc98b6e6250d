use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use certprep_core::model::{ExamId, ExamType, Question, ReviewDraft};

use super::backend::{DrawnQuestions, ExamBackend};
use crate::api::{
    CODE_CONTENT_UNAVAILABLE, ErrorBody, ExamView, GenerateQuestionsRequest,
    GenerateQuestionsResponse, PreGenerateRequest, RandomQuestionsResponse, ReviewView,
};
use crate::error::BackendError;

/// Talks to a remote pool-management server under `{base_url}/api`.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let (message, code) = match response.json::<ErrorBody>().await {
        Ok(body) => (body.error, body.code),
        Err(_) => (status.to_string(), String::new()),
    };
    if code == CODE_CONTENT_UNAVAILABLE {
        return Err(BackendError::ContentUnavailable);
    }
    Err(match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::Rejected(message)
        }
        other => BackendError::HttpStatus(other),
    })
}

#[async_trait]
impl ExamBackend for HttpBackend {
    async fn exam_by_type(&self, exam_type: &ExamType) -> Result<ExamView, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/exams/by-type/{exam_type}")))
            .send()
            .await?;
        decode(response).await
    }

    async fn generate_questions(
        &self,
        exam_id: ExamId,
        request: &GenerateQuestionsRequest,
    ) -> Result<GenerateQuestionsResponse, BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/exams/{exam_id}/generate-questions")))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn random_questions(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<DrawnQuestions, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/exams/{exam_id}/random-questions")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: RandomQuestionsResponse = decode(response).await?;
        let questions = body
            .questions
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BackendError::Rejected(e.to_string()))?;
        Ok(DrawnQuestions {
            questions,
            pool_size: body.pool_size,
        })
    }

    async fn pre_generate(&self, request: &PreGenerateRequest) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/exams/pre-generate"))
            .json(request)
            .send()
            .await?;
        let _: serde_json::Value = decode(response).await?;
        Ok(())
    }

    async fn submit_review(&self, draft: ReviewDraft) -> Result<ReviewView, BackendError> {
        let response = self
            .client
            .post(self.url("/reviews"))
            .json(&draft)
            .send()
            .await?;
        decode(response).await
    }
}
