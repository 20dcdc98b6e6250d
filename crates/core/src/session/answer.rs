use serde::{Deserialize, Serialize};

use crate::model::OptionLetter;

/// What happened to one question of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub selected: Option<OptionLetter>,
    pub is_correct: bool,
    pub attempted: bool,
    pub timed_out: bool,
}

impl AnswerRecord {
    /// Question shown, nothing submitted yet.
    #[must_use]
    pub fn reached() -> Self {
        Self {
            selected: None,
            is_correct: false,
            attempted: false,
            timed_out: false,
        }
    }

    #[must_use]
    pub fn answered(selected: OptionLetter, is_correct: bool) -> Self {
        Self {
            selected: Some(selected),
            is_correct,
            attempted: true,
            timed_out: false,
        }
    }

    #[must_use]
    pub fn timed_out() -> Self {
        Self {
            selected: None,
            is_correct: false,
            attempted: true,
            timed_out: true,
        }
    }
}
