use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::parse::parse_generated;
use super::raw::RawQuestion;
use super::{GenerationRequest, QuestionGenerator};
use crate::error::GeneratorError;

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

impl ProviderConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUESTION_PROVIDER_API_KEY").ok()?;
        let base_url = env::var("QUESTION_PROVIDER_URL").ok()?;
        if api_key.trim().is_empty() || base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }
}

/// External question provider exposing `POST {base}/generate-questions`.
#[derive(Clone)]
pub struct ProviderGenerator {
    client: Client,
    config: ProviderConfig,
}

impl ProviderGenerator {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Option<Self> {
        ProviderConfig::from_env().map(Self::new)
    }
}

#[derive(Debug, Serialize)]
struct ProviderRequest<'a> {
    prompt: String,
    exam_type: &'a str,
    num_questions: u32,
    domain: Option<&'a str>,
}

#[async_trait]
impl QuestionGenerator for ProviderGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<RawQuestion>, GeneratorError> {
        let url = format!(
            "{}/generate-questions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = ProviderRequest {
            prompt: request.prompt(),
            exam_type: request.exam_type.as_str(),
            num_questions: request.count,
            domain: request.domain.as_deref(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeneratorError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        parse_generated(&body)
    }
}
