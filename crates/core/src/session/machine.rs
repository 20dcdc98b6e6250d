use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::answer::AnswerRecord;
use super::timer::{Countdown, LoadTicket, TimerId, TokenMint};
use crate::certification::{CertificateDecision, Completion, certificate_decision};
use crate::model::{Exam, ExamId, ExamType, OptionLetter, Question, QuestionId};
use crate::scoring::ScoreSnapshot;

/// 0-based index of the question gated behind the sign-in checkpoint (the 25th question).
pub const DEFAULT_CHECKPOINT_INDEX: usize = 24;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A user action that does not apply to the current state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionActionError {
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: StateKind,
    },

    #[error("option {0} is not offered for this question")]
    UnknownOption(OptionLetter),

    #[error("question {index} was not reached in this attempt")]
    NotReached { index: usize },

    #[error("no exam switch is waiting for confirmation")]
    NoPendingSwitch,
}

//
// ─── RULES & STATE ─────────────────────────────────────────────────────────────
//

/// The parts of an exam a running attempt needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamRules {
    pub exam_id: ExamId,
    pub exam_type: ExamType,
    pub name: String,
    pub seconds_per_question: u32,
    pub passing_score: u8,
}

impl From<&Exam> for ExamRules {
    fn from(exam: &Exam) -> Self {
        Self {
            exam_id: exam.id(),
            exam_type: exam.exam_type().clone(),
            name: exam.name().to_owned(),
            seconds_per_question: exam.settings().seconds_per_question(),
            passing_score: exam.settings().passing_score(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Loading,
    Unavailable,
    QuestionActive,
    Feedback,
    Checkpoint,
    ReviewMode,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateKind::Idle => "idle",
            StateKind::Loading => "loading",
            StateKind::Unavailable => "content is unavailable",
            StateKind::QuestionActive => "a question is active",
            StateKind::Feedback => "showing feedback",
            StateKind::Checkpoint => "waiting at the sign-in checkpoint",
            StateKind::ReviewMode => "reviewing",
        };
        f.write_str(s)
    }
}

/// Sub-state of an attempt that is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Answering(Countdown),
    Feedback(AnswerRecord),
    Checkpoint { next_index: usize },
}

/// A running attempt. Its question list is fixed when the attempt starts.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: Uuid,
    rules: ExamRules,
    questions: Vec<Question>,
    index: usize,
    answers: BTreeMap<QuestionId, AnswerRecord>,
    phase: Phase,
    checkpoint_fired: bool,
}

impl Attempt {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn rules(&self) -> &ExamRules {
        &self.rules
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.index]
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, AnswerRecord> {
        &self.answers
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn checkpoint_fired(&self) -> bool {
        self.checkpoint_fired
    }

    #[must_use]
    pub fn score(&self) -> ScoreSnapshot {
        ScoreSnapshot::compute(
            self.answers.values(),
            self.questions.len(),
            self.rules.passing_score,
        )
    }
}

/// A finished attempt. Read-only; only the review cursor moves.
#[derive(Debug, Clone)]
pub struct CompletedAttempt {
    id: Uuid,
    rules: ExamRules,
    questions: Vec<Question>,
    answers: BTreeMap<QuestionId, AnswerRecord>,
    cursor: usize,
}

impl From<Attempt> for CompletedAttempt {
    fn from(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            rules: attempt.rules,
            questions: attempt.questions,
            answers: attempt.answers,
            cursor: 0,
        }
    }
}

impl CompletedAttempt {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn rules(&self) -> &ExamRules {
        &self.rules
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, AnswerRecord> {
        &self.answers
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn score(&self) -> ScoreSnapshot {
        ScoreSnapshot::compute(
            self.answers.values(),
            self.questions.len(),
            self.rules.passing_score,
        )
    }
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Loading {
        exam_type: ExamType,
        ticket: LoadTicket,
    },
    Unavailable {
        exam_type: ExamType,
        reason: String,
    },
    InProgress(Attempt),
    Review(CompletedAttempt),
}

impl SessionState {
    #[must_use]
    pub fn kind(&self) -> StateKind {
        match self {
            SessionState::Idle => StateKind::Idle,
            SessionState::Loading { .. } => StateKind::Loading,
            SessionState::Unavailable { .. } => StateKind::Unavailable,
            SessionState::InProgress(attempt) => match attempt.phase {
                Phase::Answering(_) => StateKind::QuestionActive,
                Phase::Feedback(_) => StateKind::Feedback,
                Phase::Checkpoint { .. } => StateKind::Checkpoint,
            },
            SessionState::Review(_) => StateKind::ReviewMode,
        }
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Entered `Loading`; fetch content and report back with this ticket.
    Load(LoadTicket),
    /// The requested exam is already loading or running.
    AlreadyActive,
    /// Another exam is locked in. Ask the user to resume it or abandon it.
    ConfirmSwitch {
        current: ExamType,
        requested: ExamType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchChoice {
    Resume,
    Abandon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Resumed,
    Load(LoadTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Started(TimerId),
    Unavailable,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Running { remaining: u32 },
    TimedOut(AnswerRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Question(TimerId),
    CheckpointPending,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointChoice {
    SignedIn,
    ContinueAnonymously,
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewItem<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub record: &'a AnswerRecord,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's exam session: a single authoritative state plus the few facts that outlive
/// attempts (sign-in status, a pending exam switch).
///
/// Every transition goes through a method here. Timer tokens and load tickets returned by those
/// methods are the only handles the outside world gets, so stale countdowns and stale fetches
/// are ignored instead of corrupting the current attempt.
#[derive(Debug)]
pub struct ExamSession {
    state: SessionState,
    authenticated: bool,
    pending_switch: Option<ExamType>,
    checkpoint_index: usize,
    mint: TokenMint,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            authenticated: false,
            pending_switch: None,
            checkpoint_index: DEFAULT_CHECKPOINT_INDEX,
            mint: TokenMint::default(),
        }
    }

    #[must_use]
    pub fn with_checkpoint_index(mut self, index: usize) -> Self {
        self.checkpoint_index = index;
        self
    }

    #[must_use]
    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    #[must_use]
    pub fn checkpoint_index(&self) -> usize {
        self.checkpoint_index
    }

    #[must_use]
    pub fn pending_switch(&self) -> Option<&ExamType> {
        self.pending_switch.as_ref()
    }

    /// The exam type holding the lock, if any. Locked from `Loading` until review or abandonment.
    #[must_use]
    pub fn locked_exam_type(&self) -> Option<&ExamType> {
        match &self.state {
            SessionState::Loading { exam_type, .. } => Some(exam_type),
            SessionState::InProgress(attempt) => Some(&attempt.rules.exam_type),
            SessionState::Idle | SessionState::Unavailable { .. } | SessionState::Review(_) => {
                None
            }
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked_exam_type().is_some()
    }

    #[must_use]
    pub fn attempt(&self) -> Option<&Attempt> {
        match &self.state {
            SessionState::InProgress(attempt) => Some(attempt),
            _ => None,
        }
    }

    #[must_use]
    pub fn completed(&self) -> Option<&CompletedAttempt> {
        match &self.state {
            SessionState::Review(done) => Some(done),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::InProgress(attempt) => Some(attempt.current_question()),
            SessionState::Review(done) => done.questions.get(done.cursor),
            _ => None,
        }
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        match &self.state {
            SessionState::InProgress(Attempt {
                phase: Phase::Answering(countdown),
                ..
            }) => Some(countdown.remaining()),
            _ => None,
        }
    }

    #[must_use]
    pub fn active_timer(&self) -> Option<TimerId> {
        match &self.state {
            SessionState::InProgress(Attempt {
                phase: Phase::Answering(countdown),
                ..
            }) => Some(countdown.id()),
            _ => None,
        }
    }

    #[must_use]
    pub fn score(&self) -> Option<ScoreSnapshot> {
        match &self.state {
            SessionState::InProgress(attempt) => Some(attempt.score()),
            SessionState::Review(done) => Some(done.score()),
            _ => None,
        }
    }

    #[must_use]
    pub fn certificate_decision(&self) -> Option<CertificateDecision> {
        let (score, completion) = match &self.state {
            SessionState::InProgress(attempt) => (attempt.score(), Completion::InProgress),
            SessionState::Review(done) => (done.score(), Completion::Finished),
            _ => return None,
        };
        Some(certificate_decision(&score, completion, self.authenticated))
    }

    /// The user picked an exam type.
    pub fn request_exam(&mut self, exam_type: ExamType) -> SelectOutcome {
        if let Some(current) = self.locked_exam_type() {
            if *current == exam_type {
                return SelectOutcome::AlreadyActive;
            }
            let current = current.clone();
            self.pending_switch = Some(exam_type.clone());
            return SelectOutcome::ConfirmSwitch {
                current,
                requested: exam_type,
            };
        }
        SelectOutcome::Load(self.begin_loading(exam_type))
    }

    /// Answers the resume-or-abandon prompt raised by `request_exam`.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::NoPendingSwitch` when no prompt is open.
    pub fn resolve_switch(
        &mut self,
        choice: SwitchChoice,
    ) -> Result<SwitchOutcome, SessionActionError> {
        let requested = self
            .pending_switch
            .take()
            .ok_or(SessionActionError::NoPendingSwitch)?;
        match choice {
            SwitchChoice::Resume => Ok(SwitchOutcome::Resumed),
            SwitchChoice::Abandon => {
                self.set_state(SessionState::Idle);
                Ok(SwitchOutcome::Load(self.begin_loading(requested)))
            }
        }
    }

    /// Content for `ticket` arrived. Starts the first question unless the ticket is stale.
    pub fn content_loaded(
        &mut self,
        ticket: LoadTicket,
        rules: ExamRules,
        mut questions: Vec<Question>,
    ) -> LoadOutcome {
        let exam_type = match &self.state {
            SessionState::Loading {
                exam_type,
                ticket: current,
            } if *current == ticket => exam_type.clone(),
            _ => return LoadOutcome::Stale,
        };

        let mut seen = HashSet::with_capacity(questions.len());
        questions.retain(|q| seen.insert(q.id()));
        if questions.is_empty() {
            self.set_state(SessionState::Unavailable {
                exam_type,
                reason: "no questions are available for this exam".into(),
            });
            return LoadOutcome::Unavailable;
        }

        let mut attempt = Attempt {
            id: Uuid::new_v4(),
            rules,
            questions,
            index: 0,
            answers: BTreeMap::new(),
            phase: Phase::Feedback(AnswerRecord::reached()),
            checkpoint_fired: false,
        };
        let timer = self.start_question(&mut attempt, 0);
        self.set_state(SessionState::InProgress(attempt));
        LoadOutcome::Started(timer)
    }

    /// The fetch for `ticket` failed. Returns false if the ticket was stale.
    pub fn content_failed(&mut self, ticket: LoadTicket, reason: impl Into<String>) -> bool {
        let exam_type = match &self.state {
            SessionState::Loading {
                exam_type,
                ticket: current,
            } if *current == ticket => exam_type.clone(),
            _ => return false,
        };
        self.set_state(SessionState::Unavailable {
            exam_type,
            reason: reason.into(),
        });
        true
    }

    /// Retries loading after content was unavailable.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` unless content is unavailable.
    pub fn retry(&mut self) -> Result<LoadTicket, SessionActionError> {
        match &self.state {
            SessionState::Unavailable { exam_type, .. } => {
                let exam_type = exam_type.clone();
                Ok(self.begin_loading(exam_type))
            }
            other => Err(invalid("retry loading", other.kind())),
        }
    }

    /// Submits an answer for the active question and stops its countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` unless a question is active, or
    /// `SessionActionError::UnknownOption` if the letter is not one of its options.
    pub fn submit_answer(
        &mut self,
        letter: OptionLetter,
    ) -> Result<AnswerRecord, SessionActionError> {
        let kind = self.kind();
        let SessionState::InProgress(attempt) = &mut self.state else {
            return Err(invalid("submit an answer", kind));
        };
        if !matches!(attempt.phase, Phase::Answering(_)) {
            return Err(invalid("submit an answer", kind));
        }

        let question = attempt.current_question();
        if !question.has_option(letter) {
            return Err(SessionActionError::UnknownOption(letter));
        }
        let question_id = question.id();
        let record = AnswerRecord::answered(letter, question.is_correct(letter));

        attempt.answers.insert(question_id, record);
        attempt.phase = Phase::Feedback(record);
        Ok(record)
    }

    /// One second passed on countdown `timer`. Only the active countdown counts.
    pub fn tick(&mut self, timer: TimerId) -> TickOutcome {
        let SessionState::InProgress(attempt) = &mut self.state else {
            return TickOutcome::Ignored;
        };
        let Phase::Answering(countdown) = &mut attempt.phase else {
            return TickOutcome::Ignored;
        };
        if countdown.id() != timer {
            return TickOutcome::Ignored;
        }
        if !countdown.tick() {
            return TickOutcome::Running {
                remaining: countdown.remaining(),
            };
        }

        let record = AnswerRecord::timed_out();
        let question_id = attempt.current_question().id();
        attempt.answers.insert(question_id, record);
        attempt.phase = Phase::Feedback(record);
        TickOutcome::TimedOut(record)
    }

    /// Leaves feedback for the next question, the sign-in checkpoint, or review.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` unless feedback is showing.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, SessionActionError> {
        let mut attempt = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::InProgress(attempt) if matches!(attempt.phase, Phase::Feedback(_)) => {
                attempt
            }
            other => {
                let kind = other.kind();
                self.state = other;
                return Err(invalid("advance", kind));
            }
        };

        let next = attempt.index + 1;
        if next >= attempt.questions.len() {
            self.set_state(SessionState::Review(attempt.into()));
            return Ok(AdvanceOutcome::Review);
        }

        if next == self.checkpoint_index && !self.authenticated && !attempt.checkpoint_fired {
            attempt.checkpoint_fired = true;
            attempt.phase = Phase::Checkpoint { next_index: next };
            self.state = SessionState::InProgress(attempt);
            return Ok(AdvanceOutcome::CheckpointPending);
        }

        let timer = self.start_question(&mut attempt, next);
        self.state = SessionState::InProgress(attempt);
        Ok(AdvanceOutcome::Question(timer))
    }

    /// Resumes the transition suspended at the sign-in checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` unless the checkpoint is pending.
    pub fn resolve_checkpoint(
        &mut self,
        choice: CheckpointChoice,
    ) -> Result<TimerId, SessionActionError> {
        let kind = self.kind();
        let (mut attempt, next_index) = match std::mem::replace(&mut self.state, SessionState::Idle)
        {
            SessionState::InProgress(attempt) => match attempt.phase {
                Phase::Checkpoint { next_index } => (attempt, next_index),
                _ => {
                    self.state = SessionState::InProgress(attempt);
                    return Err(invalid("resolve the checkpoint", kind));
                }
            },
            other => {
                self.state = other;
                return Err(invalid("resolve the checkpoint", kind));
            }
        };

        if choice == CheckpointChoice::SignedIn {
            self.authenticated = true;
        }
        let timer = self.start_question(&mut attempt, next_index);
        self.state = SessionState::InProgress(attempt);
        Ok(timer)
    }

    /// Drops whatever is loading or running and returns to `Idle`.
    ///
    /// Returns the score of the discarded attempt, if one was running.
    pub fn abandon(&mut self) -> Option<ScoreSnapshot> {
        let discarded = self.attempt().map(Attempt::score);
        self.set_state(SessionState::Idle);
        discarded
    }

    /// Starts a fresh attempt of the reviewed exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` outside review mode.
    pub fn restart(&mut self) -> Result<LoadTicket, SessionActionError> {
        match &self.state {
            SessionState::Review(done) => {
                let exam_type = done.rules.exam_type.clone();
                Ok(self.begin_loading(exam_type))
            }
            other => Err(invalid("restart", other.kind())),
        }
    }

    /// Leaves review mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` outside review mode.
    pub fn close(&mut self) -> Result<(), SessionActionError> {
        match &self.state {
            SessionState::Review(_) => {
                self.set_state(SessionState::Idle);
                Ok(())
            }
            other => Err(invalid("close the review", other.kind())),
        }
    }

    /// Jumps the review cursor to any question reached during the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionActionError::InvalidState` outside review mode, or
    /// `SessionActionError::NotReached` for an index the attempt never showed.
    pub fn review_question(&mut self, index: usize) -> Result<ReviewItem<'_>, SessionActionError> {
        let kind = self.kind();
        let SessionState::Review(done) = &mut self.state else {
            return Err(invalid("review a question", kind));
        };
        let reached = done
            .questions
            .get(index)
            .is_some_and(|q| done.answers.contains_key(&q.id()));
        if !reached {
            return Err(SessionActionError::NotReached { index });
        }
        done.cursor = index;

        let question = &done.questions[index];
        let record = done
            .answers
            .get(&question.id())
            .ok_or(SessionActionError::NotReached { index })?;
        Ok(ReviewItem {
            index,
            question,
            record,
        })
    }

    fn begin_loading(&mut self, exam_type: ExamType) -> LoadTicket {
        let ticket = self.mint.ticket();
        self.set_state(SessionState::Loading { exam_type, ticket });
        ticket
    }

    fn start_question(&mut self, attempt: &mut Attempt, index: usize) -> TimerId {
        let timer = self.mint.timer();
        attempt.index = index;
        let question_id = attempt.questions[index].id();
        attempt
            .answers
            .entry(question_id)
            .or_insert_with(AnswerRecord::reached);
        attempt.phase = Phase::Answering(Countdown::start(
            timer,
            attempt.rules.seconds_per_question,
        ));
        timer
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        if !self.is_locked() {
            self.pending_switch = None;
        }
    }
}

fn invalid(action: &'static str, state: StateKind) -> SessionActionError {
    SessionActionError::InvalidState { action, state }
}
