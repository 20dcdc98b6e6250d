//! Exam session state machine.
//!
//! The session owns one authoritative [`SessionState`]. Question countdowns and content fetches
//! live outside it and talk back through [`TimerId`] and [`LoadTicket`] tokens.

mod answer;
mod machine;
mod timer;

pub use answer::AnswerRecord;
pub use machine::{
    AdvanceOutcome, Attempt, CheckpointChoice, CompletedAttempt, DEFAULT_CHECKPOINT_INDEX,
    ExamRules, ExamSession, LoadOutcome, Phase, ReviewItem, SelectOutcome, SessionActionError,
    SessionState, StateKind, SwitchChoice, SwitchOutcome, TickOutcome,
};
pub use timer::{Countdown, LoadTicket, TimerId};

#[cfg(test)]
mod tests;
