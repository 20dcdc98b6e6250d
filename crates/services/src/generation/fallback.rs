use async_trait::async_trait;
use tracing::warn;

use super::chat::ChatCompletionsGenerator;
use super::provider::ProviderGenerator;
use super::raw::RawQuestion;
use super::{GenerationRequest, QuestionGenerator};
use crate::error::GeneratorError;

/// Tries the external provider first when asked to, then the chat completions generator.
///
/// With only one of them configured, that one is used regardless of the request flag.
#[derive(Clone, Default)]
pub struct FallbackGenerator {
    provider: Option<ProviderGenerator>,
    chat: Option<ChatCompletionsGenerator>,
}

impl FallbackGenerator {
    #[must_use]
    pub fn new(provider: Option<ProviderGenerator>, chat: Option<ChatCompletionsGenerator>) -> Self {
        Self { provider, chat }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ProviderGenerator::from_env(), ChatCompletionsGenerator::from_env())
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_some() || self.chat.is_some()
    }
}

#[async_trait]
impl QuestionGenerator for FallbackGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<RawQuestion>, GeneratorError> {
        match (&self.provider, &self.chat) {
            (Some(provider), Some(chat)) if request.use_external_provider => {
                match provider.generate(request).await {
                    Ok(questions) => Ok(questions),
                    Err(error) => {
                        warn!(%error, exam_type = %request.exam_type, "provider failed, falling back to chat completions");
                        chat.generate(request).await
                    }
                }
            }
            (_, Some(chat)) => chat.generate(request).await,
            (Some(provider), None) => provider.generate(request).await,
            (None, None) => Err(GeneratorError::NotConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certprep_core::model::ExamType;

    #[tokio::test]
    async fn unconfigured_chain_reports_not_configured() {
        let generator = FallbackGenerator::default();
        assert!(!generator.is_configured());
        let request = GenerationRequest {
            exam_name: "AWS Developer Associate".into(),
            exam_type: ExamType::parse("developer").unwrap(),
            count: 5,
            domain: None,
            use_external_provider: true,
        };
        assert!(matches!(
            generator.generate(&request).await,
            Err(GeneratorError::NotConfigured)
        ));
    }
}
