use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId};

pub const MAX_OPTIONS: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs between 1 and {MAX_OPTIONS} options, got {0}")]
    OptionCount(usize),

    #[error("option {0} has no text")]
    EmptyOption(OptionLetter),

    #[error("option letter {0} appears more than once")]
    DuplicateLetter(OptionLetter),

    #[error("correct answer {0} is not one of the options")]
    MissingCorrectOption(OptionLetter),

    #[error("invalid option letter {0:?}")]
    InvalidLetter(String),

    #[error("invalid difficulty {0:?}")]
    InvalidDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(QuestionError::InvalidDifficulty(s.to_owned())),
        }
    }
}

//
// ─── OPTION LETTER ─────────────────────────────────────────────────────────────
//

/// Label of a multiple-choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; MAX_OPTIONS] = [Self::A, Self::B, Self::C, Self::D];

    /// Letter for the option at `index` (0 → A).
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            OptionLetter::A => 'A',
            OptionLetter::B => 'B',
            OptionLetter::C => 'C',
            OptionLetter::D => 'D',
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for OptionLetter {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(QuestionError::InvalidLetter(s.to_owned())),
        }
    }
}

impl TryFrom<String> for OptionLetter {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptionLetter> for String {
    fn from(value: OptionLetter) -> Self {
        value.as_char().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub letter: OptionLetter,
    pub text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(letter: OptionLetter, text: impl Into<String>) -> Self {
        Self {
            letter,
            text: text.into(),
        }
    }
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Canonical shape every question takes once it crosses into the domain, whatever the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub exam_id: ExamId,
    pub text: String,
    pub domain: String,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub options: Vec<AnswerOption>,
    pub correct: OptionLetter,
}

impl QuestionDraft {
    /// Checks the draft and trims its text fields.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, the option count is outside `1..=4`,
    /// an option is blank or repeats a letter, or the correct letter has no option.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.is_empty() || self.options.len() > MAX_OPTIONS {
            return Err(QuestionError::OptionCount(self.options.len()));
        }

        let mut options: Vec<AnswerOption> = Vec::with_capacity(self.options.len());
        for option in self.options {
            if options.iter().any(|seen| seen.letter == option.letter) {
                return Err(QuestionError::DuplicateLetter(option.letter));
            }
            let trimmed = option.text.trim();
            if trimmed.is_empty() {
                return Err(QuestionError::EmptyOption(option.letter));
            }
            options.push(AnswerOption::new(option.letter, trimmed));
        }
        options.sort_by_key(|o| o.letter);

        if !options.iter().any(|o| o.letter == self.correct) {
            return Err(QuestionError::MissingCorrectOption(self.correct));
        }

        Ok(ValidatedQuestion {
            exam_id: self.exam_id,
            text,
            domain: self.domain.trim().to_owned(),
            difficulty: self.difficulty,
            explanation: self.explanation.trim().to_owned(),
            options,
            correct: self.correct,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub exam_id: ExamId,
    pub text: String,
    pub domain: String,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub options: Vec<AnswerOption>,
    pub correct: OptionLetter,
    pub created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            exam_id: self.exam_id,
            text: self.text,
            domain: self.domain,
            difficulty: self.difficulty,
            explanation: self.explanation,
            options: self.options,
            correct: self.correct,
            created_at: self.created_at,
        }
    }
}

/// A stored question. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    exam_id: ExamId,
    text: String,
    domain: String,
    difficulty: Difficulty,
    explanation: String,
    options: Vec<AnswerOption>,
    correct: OptionLetter,
    created_at: DateTime<Utc>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_letter(&self) -> OptionLetter {
        self.correct
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn has_option(&self, letter: OptionLetter) -> bool {
        self.options.iter().any(|o| o.letter == letter)
    }

    #[must_use]
    pub fn is_correct(&self, letter: OptionLetter) -> bool {
        self.correct == letter
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
