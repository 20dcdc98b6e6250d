//! Content generators: anything that can produce candidate questions for an exam.
//!
//! Generators return loosely shaped [`RawQuestion`]s. They are normalised into
//! [`QuestionDraft`](certprep_core::model::QuestionDraft)s before anything else sees them.

mod chat;
mod fallback;
mod parse;
mod provider;
mod raw;

use async_trait::async_trait;
use certprep_core::model::ExamType;

use crate::error::GeneratorError;

pub use chat::{ChatCompletionsConfig, ChatCompletionsGenerator};
pub use fallback::FallbackGenerator;
pub use parse::parse_generated;
pub use provider::{ProviderConfig, ProviderGenerator};
pub use raw::{RawOption, RawQuestion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub exam_name: String,
    pub exam_type: ExamType,
    pub count: u32,
    pub domain: Option<String>,
    pub use_external_provider: bool,
}

impl GenerationRequest {
    #[must_use]
    pub fn prompt(&self) -> String {
        let focus = self
            .domain
            .as_deref()
            .map(|d| format!(" focused on {d}"))
            .unwrap_or_default();
        format!(
            "Generate {count} multiple choice questions for the {name} certification exam{focus}. \
             Respond with only a JSON array. Each element has question_text, domain, \
             difficulty (easy, medium or hard), explanation, options (up to four objects with \
             letter A-D and text) and correct_answer_letter.",
            count = self.count,
            name = self.exam_name,
        )
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce up to `request.count` candidate questions.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError` when the generator is unconfigured, the request fails or the
    /// output cannot be parsed.
    async fn generate(&self, request: &GenerationRequest)
    -> Result<Vec<RawQuestion>, GeneratorError>;
}
