//! JSON shapes exchanged over the pool-management HTTP API.
//!
//! The server builds them from domain types; the HTTP backend turns them back into domain types
//! on receipt, so nothing past this module sees the wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certprep_core::model::{
    AnswerOption, Difficulty, ExamId, ExamType, OptionLetter, Question, QuestionDraft,
    QuestionError, QuestionId, Review,
};
use certprep_core::session::ExamRules;
use storage::repository::QuestionFilter;

use crate::pool::{EnrichmentReport, ExamSummary, SampledQuestions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamView {
    pub id: ExamId,
    pub name: String,
    pub exam_type: ExamType,
    pub description: String,
    pub session_size: u32,
    pub target_pool_size: u32,
    pub seconds_per_question: u32,
    pub passing_score: u8,
    pub questions_count: u32,
}

impl ExamView {
    #[must_use]
    pub fn rules(&self) -> ExamRules {
        ExamRules {
            exam_id: self.id,
            exam_type: self.exam_type.clone(),
            name: self.name.clone(),
            seconds_per_question: self.seconds_per_question,
            passing_score: self.passing_score,
        }
    }
}

impl From<&ExamSummary> for ExamView {
    fn from(summary: &ExamSummary) -> Self {
        let exam = &summary.exam;
        let settings = exam.settings();
        Self {
            id: exam.id(),
            name: exam.name().to_owned(),
            exam_type: exam.exam_type().clone(),
            description: exam.description().to_owned(),
            session_size: settings.session_size(),
            target_pool_size: settings.target_pool_size(),
            seconds_per_question: settings.seconds_per_question(),
            passing_score: settings.passing_score(),
            questions_count: summary.question_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub letter: OptionLetter,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub exam_id: ExamId,
    pub question_text: String,
    pub domain: String,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub options: Vec<OptionView>,
    pub correct_answer_letter: OptionLetter,
    pub created_at: DateTime<Utc>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id(),
            exam_id: q.exam_id(),
            question_text: q.text().to_owned(),
            domain: q.domain().to_owned(),
            difficulty: q.difficulty(),
            explanation: q.explanation().to_owned(),
            options: q
                .options()
                .iter()
                .map(|o| OptionView {
                    letter: o.letter,
                    text: o.text.clone(),
                })
                .collect(),
            correct_answer_letter: q.correct_letter(),
            created_at: q.created_at(),
        }
    }
}

impl TryFrom<QuestionView> for Question {
    type Error = QuestionError;

    fn try_from(view: QuestionView) -> Result<Self, Self::Error> {
        let draft = QuestionDraft {
            exam_id: view.exam_id,
            text: view.question_text,
            domain: view.domain,
            difficulty: view.difficulty,
            explanation: view.explanation,
            options: view
                .options
                .into_iter()
                .map(|o| AnswerOption::new(o.letter, o.text))
                .collect(),
            correct: view.correct_answer_letter,
        };
        Ok(draft.validate(view.created_at)?.assign_id(view.id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateQuestionsRequest {
    #[serde(default)]
    pub num_questions: Option<u32>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub use_external_provider: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateQuestionsResponse {
    pub created_count: u32,
    pub duplicate_count: u32,
    pub total_questions: u32,
    pub skipped: bool,
    pub reason: Option<String>,
}

impl From<&EnrichmentReport> for GenerateQuestionsResponse {
    fn from(report: &EnrichmentReport) -> Self {
        Self {
            created_count: report.created,
            duplicate_count: report.duplicates,
            total_questions: report.total,
            skipped: report.skipped(),
            reason: report.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomQuestionsResponse {
    pub questions: Vec<QuestionView>,
    pub count: u32,
    pub pool_size: u32,
    pub total_available: u32,
}

impl From<&SampledQuestions> for RandomQuestionsResponse {
    fn from(sample: &SampledQuestions) -> Self {
        let questions: Vec<QuestionView> = sample.questions.iter().map(QuestionView::from).collect();
        Self {
            count: u32::try_from(questions.len()).unwrap_or(u32::MAX),
            questions,
            pool_size: sample.pool_size,
            total_available: sample.pool_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreGenerateRequest {
    pub exam_type: ExamType,
    #[serde(default)]
    pub num_questions: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreGenerateResponse {
    pub exam_id: ExamId,
    pub exam_type: ExamType,
    pub questions_count: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewView {
    pub id: u64,
    pub exam_id: ExamId,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub exam_score: Option<u8>,
    pub passed: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(r: &Review) -> Self {
        Self {
            id: r.id().value(),
            exam_id: r.exam_id(),
            user_name: r.user_name().to_owned(),
            rating: r.rating(),
            comment: r.comment().to_owned(),
            exam_score: r.exam_score(),
            passed: r.passed(),
            created_at: r.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQuery {
    pub exam_id: ExamId,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Query string of the question listing. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionQuery {
    #[serde(default)]
    pub exam_id: Option<ExamId>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl QuestionQuery {
    #[must_use]
    pub fn filter(&self) -> QuestionFilter {
        QuestionFilter {
            exam_id: self.exam_id,
            domain: self.domain.clone(),
            difficulty: self.difficulty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomQuestionsQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Body of every non-2xx response. `code` tells apart failures sharing a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

pub const CODE_NOT_FOUND: &str = "not_found";
pub const CODE_CONTENT_UNAVAILABLE: &str = "content_unavailable";
pub const CODE_INVALID: &str = "invalid_request";
pub const CODE_CONFLICT: &str = "conflict";
pub const CODE_INTERNAL: &str = "internal";
