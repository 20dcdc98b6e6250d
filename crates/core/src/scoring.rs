//! Read-only scoring over a session's answer records.

use serde::{Deserialize, Serialize};

use crate::session::AnswerRecord;

/// Derived view over the answer records of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    pub total: u32,
    pub percentage: u8,
    pub passing_score: u8,
    pub passed: bool,
}

impl ScoreSnapshot {
    /// Scores `records` against `total` questions.
    ///
    /// The percentage is `correct / total * 100` rounded half up. Records that were reached
    /// but never attempted count as unanswered, not incorrect. An empty exam scores 0.
    #[must_use]
    pub fn compute<'a>(
        records: impl IntoIterator<Item = &'a AnswerRecord>,
        total: usize,
        passing_score: u8,
    ) -> Self {
        let mut correct = 0_u32;
        let mut incorrect = 0_u32;
        for record in records {
            if record.is_correct {
                correct = correct.saturating_add(1);
            } else if record.attempted {
                incorrect = incorrect.saturating_add(1);
            }
        }

        let total = u32::try_from(total).unwrap_or(u32::MAX);
        let percentage = if total == 0 {
            0
        } else {
            let rounded = (u64::from(correct) * 100 + u64::from(total) / 2) / u64::from(total);
            u8::try_from(rounded.min(100)).unwrap_or(100)
        };

        Self {
            correct,
            incorrect,
            unanswered: total.saturating_sub(correct).saturating_sub(incorrect),
            total,
            percentage,
            passing_score,
            passed: percentage >= passing_score,
        }
    }
}
