use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use certprep_core::Clock;
use certprep_core::certification::{CertificateDecision, CertificateFlow, CertificateGrant};
use certprep_core::model::{ExamType, OptionLetter, Question, ReviewDraft};
use certprep_core::scoring::ScoreSnapshot;
use certprep_core::session::{
    AdvanceOutcome, AnswerRecord, CheckpointChoice, DEFAULT_CHECKPOINT_INDEX, ExamSession,
    LoadOutcome, LoadTicket, Phase, SelectOutcome, SessionActionError, SessionState, StateKind,
    SwitchChoice, SwitchOutcome, TickOutcome, TimerId,
};

use super::backend::{DrawnQuestions, ExamBackend};
use super::countdown::CountdownDriver;
use crate::api::{ExamView, GenerateQuestionsRequest, PreGenerateRequest, ReviewView};
use crate::error::{BackendError, ConfigError, ControllerError};

pub const DEFAULT_SESSION_SAMPLE_SIZE: u32 = 50;
pub const DEFAULT_GENERATION_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    sample_size: u32,
    checkpoint_index: usize,
    generation_wait: Duration,
}

impl SessionSettings {
    /// `generation_wait` bounds how long loading waits for pool enrichment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the sample size or the wait is zero.
    pub fn new(
        sample_size: u32,
        checkpoint_index: usize,
        generation_wait: Duration,
    ) -> Result<Self, ConfigError> {
        if sample_size == 0 {
            return Err(ConfigError::InvalidSampleSize);
        }
        if generation_wait.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self {
            sample_size,
            checkpoint_index,
            generation_wait,
        })
    }

    #[must_use]
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    #[must_use]
    pub fn checkpoint_index(&self) -> usize {
        self.checkpoint_index
    }

    #[must_use]
    pub fn generation_wait(&self) -> Duration {
        self.generation_wait
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SESSION_SAMPLE_SIZE,
            checkpoint_index: DEFAULT_CHECKPOINT_INDEX,
            generation_wait: DEFAULT_GENERATION_WAIT,
        }
    }
}

/// Snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub state: StateKind,
    pub exam_type: Option<ExamType>,
    pub question_index: Option<usize>,
    pub question_count: usize,
    pub remaining_seconds: Option<u32>,
    pub feedback: Option<AnswerRecord>,
    pub pending_switch: Option<ExamType>,
    pub locked: bool,
    pub authenticated: bool,
    pub unavailable_reason: Option<String>,
    pub score: Option<ScoreSnapshot>,
    pub certificate: Option<CertificateDecision>,
}

impl SessionView {
    fn capture(session: &ExamSession) -> Self {
        let mut view = Self {
            state: session.kind(),
            exam_type: None,
            question_index: None,
            question_count: 0,
            remaining_seconds: session.remaining_seconds(),
            feedback: None,
            pending_switch: session.pending_switch().cloned(),
            locked: session.is_locked(),
            authenticated: session.is_authenticated(),
            unavailable_reason: None,
            score: session.score(),
            certificate: session.certificate_decision(),
        };
        match session.state() {
            SessionState::Idle => {}
            SessionState::Loading { exam_type, .. } => view.exam_type = Some(exam_type.clone()),
            SessionState::Unavailable { exam_type, reason } => {
                view.exam_type = Some(exam_type.clone());
                view.unavailable_reason = Some(reason.clone());
            }
            SessionState::InProgress(attempt) => {
                view.exam_type = Some(attempt.rules().exam_type.clone());
                view.question_index = Some(attempt.index());
                view.question_count = attempt.questions().len();
                if let Phase::Feedback(record) = attempt.phase() {
                    view.feedback = Some(record);
                }
            }
            SessionState::Review(done) => {
                view.exam_type = Some(done.rules().exam_type.clone());
                view.question_index = Some(done.cursor());
                view.question_count = done.questions().len();
            }
        }
        view
    }
}

/// A reviewed question, detached from the session lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub index: usize,
    pub question: Question,
    pub record: AnswerRecord,
}

struct Shared {
    session: Mutex<ExamSession>,
    view: watch::Sender<SessionView>,
}

impl Shared {
    /// Runs `f` under the session lock and publishes the resulting view.
    fn update<R>(&self, f: impl FnOnce(&mut ExamSession) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut session);
        self.view.send_replace(SessionView::capture(&session));
        out
    }

    fn read<R>(&self, f: impl FnOnce(&ExamSession) -> R) -> R {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&session)
    }
}

/// Drives one user's `ExamSession`: fetches content through an [`ExamBackend`], runs the single
/// question countdown and publishes a [`SessionView`] after every transition.
#[derive(Clone)]
pub struct ExamSessionController {
    clock: Clock,
    backend: Arc<dyn ExamBackend>,
    settings: SessionSettings,
    shared: Arc<Shared>,
    countdown: Arc<CountdownDriver>,
}

impl ExamSessionController {
    #[must_use]
    pub fn new(clock: Clock, backend: Arc<dyn ExamBackend>, settings: SessionSettings) -> Self {
        let session = ExamSession::new().with_checkpoint_index(settings.checkpoint_index);
        let (view, _) = watch::channel(SessionView::capture(&session));
        Self {
            clock,
            backend,
            settings,
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                view,
            }),
            countdown: Arc::new(CountdownDriver::default()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.shared.update(|s| s.set_authenticated(authenticated));
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        self.shared.read(|s| s.current_question().cloned())
    }

    #[must_use]
    pub fn score(&self) -> Option<ScoreSnapshot> {
        self.shared.read(ExamSession::score)
    }

    #[must_use]
    pub fn certificate_decision(&self) -> Option<CertificateDecision> {
        self.shared.read(ExamSession::certificate_decision)
    }

    /// Warms the pool for `exam_type` before the user commits to it.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Backend` if the backend rejects the request.
    pub async fn pre_generate(&self, exam_type: ExamType) -> Result<(), ControllerError> {
        let request = PreGenerateRequest {
            exam_type,
            num_questions: None,
        };
        self.backend.pre_generate(&request).await?;
        Ok(())
    }

    /// The user picked an exam. Loads it unless another exam is locked in, in which case the
    /// resume-or-abandon prompt is raised instead.
    pub async fn select_exam(&self, exam_type: ExamType) -> SelectOutcome {
        let outcome = self.shared.update(|s| s.request_exam(exam_type.clone()));
        match &outcome {
            SelectOutcome::Load(ticket) => {
                self.load(*ticket, exam_type).await;
            }
            SelectOutcome::ConfirmSwitch { current, requested } => {
                info!(%current, %requested, "exam switch needs confirmation");
            }
            SelectOutcome::AlreadyActive => {}
        }
        outcome
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` when no switch prompt is open.
    pub async fn resolve_switch(
        &self,
        choice: SwitchChoice,
    ) -> Result<SwitchOutcome, ControllerError> {
        let (outcome, exam_type) = self.shared.update(|s| {
            let outcome = s.resolve_switch(choice)?;
            Ok::<_, ControllerError>((outcome, loading_exam_type(s)))
        })?;
        if let (SwitchOutcome::Load(ticket), Some(exam_type)) = (outcome, exam_type) {
            self.countdown.stop();
            info!(%exam_type, "previous attempt abandoned");
            self.load(ticket, exam_type).await;
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` unless content is unavailable.
    pub async fn retry(&self) -> Result<LoadOutcome, ControllerError> {
        self.reload(ExamSession::retry).await
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` outside review mode.
    pub async fn restart(&self) -> Result<LoadOutcome, ControllerError> {
        self.reload(ExamSession::restart).await
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` unless a question is active or the option is unknown.
    pub fn submit_answer(&self, letter: OptionLetter) -> Result<AnswerRecord, ControllerError> {
        // Stopped under the session lock; a rejected answer leaves the clock running.
        let record = self
            .shared
            .update(|s| s.submit_answer(letter).inspect(|_| self.countdown.stop()))?;
        debug!(?letter, correct = record.is_correct, "answer submitted");
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` unless feedback is showing.
    pub fn advance(&self) -> Result<AdvanceOutcome, ControllerError> {
        let outcome = self.shared.update(ExamSession::advance)?;
        match outcome {
            AdvanceOutcome::Question(timer) => self.start_countdown(timer),
            AdvanceOutcome::CheckpointPending => {
                self.countdown.stop();
                info!("sign-in checkpoint reached");
            }
            AdvanceOutcome::Review => {
                self.countdown.stop();
                info!(score = ?self.score(), "attempt finished");
            }
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` unless the checkpoint is pending.
    pub fn resolve_checkpoint(&self, choice: CheckpointChoice) -> Result<TimerId, ControllerError> {
        let timer = self.shared.update(|s| s.resolve_checkpoint(choice))?;
        self.start_countdown(timer);
        Ok(timer)
    }

    /// Drops the running attempt. Enrichment already running on the server is left alone.
    pub fn abandon(&self) -> Option<ScoreSnapshot> {
        self.countdown.stop();
        let discarded = self.shared.update(ExamSession::abandon);
        if discarded.is_some() {
            info!("attempt abandoned");
        }
        discarded
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` outside review mode.
    pub fn close(&self) -> Result<(), ControllerError> {
        self.shared.update(ExamSession::close)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Action` outside review mode or for unreached questions.
    pub fn review_question(&self, index: usize) -> Result<ReviewEntry, ControllerError> {
        let entry = self.shared.update(|s| {
            s.review_question(index).map(|item| ReviewEntry {
                index: item.index,
                question: item.question.clone(),
                record: *item.record,
            })
        })?;
        Ok(entry)
    }

    /// Opens the certificate flow for a finished, passed attempt of a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NotEligible` with the blocking decision otherwise.
    pub fn begin_certificate(
        &self,
        holder: &str,
        request_feedback: bool,
    ) -> Result<CertificateFlow, ControllerError> {
        let issued_at = self.clock.now();
        self.shared.read(|s| {
            let decision = s
                .certificate_decision()
                .unwrap_or(CertificateDecision::Incomplete);
            let done = s
                .completed()
                .ok_or(ControllerError::NotEligible(decision))?;
            let score = done.score();
            let grant = CertificateGrant {
                exam_id: done.rules().exam_id,
                exam_type: done.rules().exam_type.clone(),
                exam_name: done.rules().name.clone(),
                holder: holder.to_owned(),
                percentage: score.percentage,
                correct: score.correct,
                total: score.total,
                issued_at,
            };
            CertificateFlow::begin(decision, grant, request_feedback)
                .map_err(ControllerError::NotEligible)
        })
    }

    /// Sends feedback for the reviewed attempt, attaching its score.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NothingToReview` outside review mode, or the backend's error.
    pub async fn submit_feedback(
        &self,
        user_uid: &str,
        user_name: &str,
        rating: u8,
        comment: &str,
    ) -> Result<ReviewView, ControllerError> {
        let draft = self
            .shared
            .read(|s| {
                s.completed().map(|done| {
                    let score = done.score();
                    ReviewDraft {
                        exam_id: done.rules().exam_id,
                        user_uid: user_uid.to_owned(),
                        user_name: user_name.to_owned(),
                        rating,
                        comment: comment.to_owned(),
                        exam_score: Some(score.percentage),
                        passed: Some(score.passed),
                    }
                })
            })
            .ok_or(ControllerError::NothingToReview)?;
        Ok(self.backend.submit_review(draft).await?)
    }

    async fn reload(
        &self,
        begin: impl FnOnce(&mut ExamSession) -> Result<LoadTicket, SessionActionError>,
    ) -> Result<LoadOutcome, ControllerError> {
        let (ticket, exam_type) = self.shared.update(|s| {
            let ticket = begin(s)?;
            Ok::<_, ControllerError>((ticket, loading_exam_type(s)))
        })?;
        self.countdown.stop();
        match exam_type {
            Some(exam_type) => Ok(self.load(ticket, exam_type).await),
            None => Ok(LoadOutcome::Stale),
        }
    }

    async fn load(&self, ticket: LoadTicket, exam_type: ExamType) -> LoadOutcome {
        match self.fetch(&exam_type).await {
            Ok((exam, drawn)) => {
                let outcome = self
                    .shared
                    .update(|s| s.content_loaded(ticket, exam.rules(), drawn.questions));
                match outcome {
                    LoadOutcome::Started(timer) => {
                        info!(%exam_type, pool_size = drawn.pool_size, "attempt started");
                        self.start_countdown(timer);
                    }
                    LoadOutcome::Unavailable => {
                        warn!(%exam_type, "sample came back empty");
                    }
                    LoadOutcome::Stale => debug!(%exam_type, "discarding stale content"),
                }
                outcome
            }
            Err(error) => {
                warn!(%exam_type, %error, "exam content unavailable");
                if self.shared.update(|s| s.content_failed(ticket, error.to_string())) {
                    LoadOutcome::Unavailable
                } else {
                    LoadOutcome::Stale
                }
            }
        }
    }

    /// Enrichment bounded by the generation wait, then sampling. Enrichment failures fall through
    /// to whatever the pool already holds.
    async fn fetch(&self, exam_type: &ExamType) -> Result<(ExamView, DrawnQuestions), BackendError> {
        let exam = self.backend.exam_by_type(exam_type).await?;
        let request = GenerateQuestionsRequest::default();
        let enrichment = tokio::time::timeout(
            self.settings.generation_wait,
            self.backend.generate_questions(exam.id, &request),
        )
        .await;
        match enrichment {
            Ok(Ok(report)) => debug!(
                created = report.created_count,
                total = report.total_questions,
                skipped = report.skipped,
                "pool checked"
            ),
            Ok(Err(error)) => warn!(%error, "pool enrichment failed, using existing pool"),
            Err(_) => warn!(
                wait = ?self.settings.generation_wait,
                "pool enrichment timed out, using existing pool"
            ),
        }
        let drawn = self
            .backend
            .random_questions(exam.id, self.settings.sample_size)
            .await?;
        Ok((exam, drawn))
    }

    fn start_countdown(&self, timer: TimerId) {
        let shared = Arc::clone(&self.shared);
        self.countdown.start(timer, move |timer| {
            match shared.update(|s| s.tick(timer)) {
                TickOutcome::Running { .. } => true,
                TickOutcome::TimedOut(_) => {
                    debug!(timer = timer.value(), "question timed out");
                    false
                }
                TickOutcome::Ignored => false,
            }
        });
    }
}

fn loading_exam_type(session: &ExamSession) -> Option<ExamType> {
    match session.state() {
        SessionState::Loading { exam_type, .. } => Some(exam_type.clone()),
        _ => None,
    }
}
