use certprep_core::model::{
    AnswerOption, Difficulty, ExamId, MAX_OPTIONS, OptionLetter, QuestionDraft, QuestionError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A question as generators and import files describe it.
///
/// Accepts `question` for `question_text` and `answers` for `options`. The correct letter comes
/// from `correct_answer_letter`, or else from the first option flagged `is_correct`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default, alias = "question")]
    pub question_text: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, alias = "answers")]
    pub options: Vec<RawOption>,
    #[serde(default, alias = "correct_answer")]
    pub correct_answer_letter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOption {
    #[serde(default)]
    pub letter: Option<String>,
    #[serde(default, alias = "label")]
    pub text: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

impl RawQuestion {
    /// Decodes every element of a JSON question list on its own, so one malformed entry does not
    /// take the rest of the list down with it.
    #[must_use]
    pub fn decode_each(items: Vec<Value>) -> Vec<Result<Self, serde_json::Error>> {
        items.into_iter().map(Self::deserialize).collect()
    }

    /// Canonical draft for `exam_id`. Options past the fourth are dropped, missing letters are
    /// assigned by position and unknown difficulties read as medium.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if there is no text, no usable option, or no way to tell which
    /// option is correct. Further checks happen in `QuestionDraft::validate`.
    pub fn normalize(self, exam_id: ExamId) -> Result<QuestionDraft, QuestionError> {
        let text = self.question_text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let mut options = Vec::with_capacity(MAX_OPTIONS);
        let mut flagged = None;
        for (index, raw) in self.options.into_iter().take(MAX_OPTIONS).enumerate() {
            let letter = match raw.letter.as_deref().map(str::trim) {
                Some(l) if !l.is_empty() => l.parse::<OptionLetter>()?,
                _ => OptionLetter::from_index(index).ok_or(QuestionError::OptionCount(index + 1))?,
            };
            if raw.is_correct && flagged.is_none() {
                flagged = Some(letter);
            }
            options.push(AnswerOption::new(letter, raw.text.unwrap_or_default()));
        }
        if options.is_empty() {
            return Err(QuestionError::OptionCount(0));
        }

        let correct = match self.correct_answer_letter.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.parse::<OptionLetter>()?,
            _ => flagged.ok_or_else(|| QuestionError::InvalidLetter(String::new()))?,
        };

        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|d| d.parse::<Difficulty>().ok())
            .unwrap_or_default();

        Ok(QuestionDraft {
            exam_id,
            text,
            domain: self.domain.unwrap_or_default(),
            difficulty,
            explanation: self.explanation.unwrap_or_default(),
            options,
            correct,
        })
    }
}
