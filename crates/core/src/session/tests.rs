use super::*;
use crate::certification::CertificateDecision;
use crate::model::{
    AnswerOption, Difficulty, ExamId, ExamType, OptionLetter, Question, QuestionDraft, QuestionId,
};
use crate::time::fixed_now;

fn exam_type(slug: &str) -> ExamType {
    ExamType::parse(slug).unwrap()
}

fn rules(slug: &str, seconds: u32) -> ExamRules {
    ExamRules {
        exam_id: ExamId::new(1),
        exam_type: exam_type(slug),
        name: format!("Practice {slug}"),
        seconds_per_question: seconds,
        passing_score: 70,
    }
}

fn questions(n: u64) -> Vec<Question> {
    (1..=n)
        .map(|i| {
            QuestionDraft {
                exam_id: ExamId::new(1),
                text: format!("Question {i}"),
                domain: "Compute".into(),
                difficulty: Difficulty::Medium,
                explanation: String::new(),
                options: vec![
                    AnswerOption::new(OptionLetter::A, "right"),
                    AnswerOption::new(OptionLetter::B, "wrong"),
                ],
                correct: OptionLetter::A,
            }
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new(i))
        })
        .collect()
}

fn started(session: &mut ExamSession, slug: &str, n: u64) -> TimerId {
    let SelectOutcome::Load(ticket) = session.request_exam(exam_type(slug)) else {
        panic!("expected a load");
    };
    match session.content_loaded(ticket, rules(slug, 90), questions(n)) {
        LoadOutcome::Started(timer) => timer,
        other => panic!("unexpected {other:?}"),
    }
}

/// Answers the current question and advances, returning what the advance produced.
fn answer_and_advance(session: &mut ExamSession, letter: OptionLetter) -> AdvanceOutcome {
    session.submit_answer(letter).unwrap();
    session.advance().unwrap()
}

#[test]
fn loading_starts_first_question_with_full_timer() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 3);

    assert_eq!(session.kind(), StateKind::QuestionActive);
    assert_eq!(session.remaining_seconds(), Some(90));
    assert_eq!(session.current_question().unwrap().id(), QuestionId::new(1));
    assert!(session.is_locked());
}

#[test]
fn empty_content_is_unavailable_and_retry_reloads() {
    let mut session = ExamSession::new();
    let SelectOutcome::Load(ticket) = session.request_exam(exam_type("developer")) else {
        panic!("expected a load");
    };
    assert_eq!(
        session.content_loaded(ticket, rules("developer", 90), Vec::new()),
        LoadOutcome::Unavailable
    );
    assert_eq!(session.kind(), StateKind::Unavailable);
    assert!(!session.is_locked());

    let retry = session.retry().unwrap();
    assert_ne!(retry, ticket);
    assert_eq!(session.kind(), StateKind::Loading);
}

#[test]
fn failed_fetch_moves_to_unavailable() {
    let mut session = ExamSession::new();
    let SelectOutcome::Load(ticket) = session.request_exam(exam_type("developer")) else {
        panic!("expected a load");
    };
    assert!(session.content_failed(ticket, "backend down"));
    match session.state() {
        SessionState::Unavailable { reason, .. } => assert_eq!(reason, "backend down"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn stale_load_results_are_ignored() {
    let mut session = ExamSession::new();
    let SelectOutcome::Load(old) = session.request_exam(exam_type("developer")) else {
        panic!("expected a load");
    };
    session.content_failed(old, "timeout");
    let fresh = session.retry().unwrap();

    assert_eq!(
        session.content_loaded(old, rules("developer", 90), questions(2)),
        LoadOutcome::Stale
    );
    assert!(!session.content_failed(old, "late"));
    assert_eq!(session.kind(), StateKind::Loading);
    assert!(matches!(
        session.content_loaded(fresh, rules("developer", 90), questions(2)),
        LoadOutcome::Started(_)
    ));
}

#[test]
fn duplicate_questions_in_content_are_dropped() {
    let mut session = ExamSession::new();
    let SelectOutcome::Load(ticket) = session.request_exam(exam_type("developer")) else {
        panic!("expected a load");
    };
    let mut qs = questions(2);
    qs.push(qs[0].clone());
    session.content_loaded(ticket, rules("developer", 90), qs);
    assert_eq!(session.attempt().unwrap().questions().len(), 2);
}

#[test]
fn answering_records_and_stops_timer() {
    let mut session = ExamSession::new();
    let timer = started(&mut session, "developer", 2);

    let record = session.submit_answer(OptionLetter::A).unwrap();
    assert!(record.is_correct);
    assert_eq!(session.kind(), StateKind::Feedback);
    assert_eq!(session.remaining_seconds(), None);
    assert_eq!(session.tick(timer), TickOutcome::Ignored);

    let err = session.submit_answer(OptionLetter::B).unwrap_err();
    assert!(matches!(err, SessionActionError::InvalidState { .. }));
}

#[test]
fn unknown_option_is_rejected() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 1);
    assert_eq!(
        session.submit_answer(OptionLetter::D),
        Err(SessionActionError::UnknownOption(OptionLetter::D))
    );
    assert_eq!(session.kind(), StateKind::QuestionActive);
}

#[test]
fn timeout_records_unanswered_attempt_exactly_once() {
    let mut session = ExamSession::new();
    let SelectOutcome::Load(ticket) = session.request_exam(exam_type("developer")) else {
        panic!("expected a load");
    };
    let LoadOutcome::Started(timer) =
        session.content_loaded(ticket, rules("developer", 3), questions(2))
    else {
        panic!("expected start");
    };

    assert_eq!(session.tick(timer), TickOutcome::Running { remaining: 2 });
    assert_eq!(session.tick(timer), TickOutcome::Running { remaining: 1 });
    let TickOutcome::TimedOut(record) = session.tick(timer) else {
        panic!("expected timeout");
    };
    assert_eq!(record.selected, None);
    assert!(record.timed_out);
    assert!(record.attempted);
    assert!(!record.is_correct);
    assert_eq!(session.kind(), StateKind::Feedback);

    assert_eq!(session.tick(timer), TickOutcome::Ignored);
}

#[test]
fn ticks_from_previous_question_are_ignored() {
    let mut session = ExamSession::new();
    let first = started(&mut session, "developer", 3);
    let AdvanceOutcome::Question(second) = answer_and_advance(&mut session, OptionLetter::A)
    else {
        panic!("expected next question");
    };

    assert_ne!(first, second);
    assert_eq!(session.tick(first), TickOutcome::Ignored);
    assert_eq!(session.remaining_seconds(), Some(90));
    assert_eq!(
        session.tick(second),
        TickOutcome::Running { remaining: 89 }
    );
}

#[test]
fn checkpoint_fires_once_before_twenty_fifth_question() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 50);

    for _ in 0..23 {
        assert!(matches!(
            answer_and_advance(&mut session, OptionLetter::A),
            AdvanceOutcome::Question(_)
        ));
    }
    assert_eq!(session.attempt().unwrap().index(), 23);
    assert_eq!(
        answer_and_advance(&mut session, OptionLetter::A),
        AdvanceOutcome::CheckpointPending
    );
    assert_eq!(session.kind(), StateKind::Checkpoint);
    assert_eq!(session.remaining_seconds(), None);

    session
        .resolve_checkpoint(CheckpointChoice::ContinueAnonymously)
        .unwrap();
    assert_eq!(session.attempt().unwrap().index(), 24);
    assert!(!session.is_authenticated());

    for _ in 24..49 {
        assert!(matches!(
            answer_and_advance(&mut session, OptionLetter::A),
            AdvanceOutcome::Question(_)
        ));
    }
    assert_eq!(
        answer_and_advance(&mut session, OptionLetter::A),
        AdvanceOutcome::Review
    );
}

#[test]
fn signing_in_at_checkpoint_authenticates() {
    let mut session = ExamSession::new().with_checkpoint_index(1);
    started(&mut session, "developer", 3);
    assert_eq!(
        answer_and_advance(&mut session, OptionLetter::A),
        AdvanceOutcome::CheckpointPending
    );
    session.resolve_checkpoint(CheckpointChoice::SignedIn).unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.kind(), StateKind::QuestionActive);
}

#[test]
fn authenticated_users_skip_checkpoint() {
    let mut session = ExamSession::new()
        .with_checkpoint_index(1)
        .with_authenticated(true);
    started(&mut session, "developer", 3);
    assert!(matches!(
        answer_and_advance(&mut session, OptionLetter::A),
        AdvanceOutcome::Question(_)
    ));
}

#[test]
fn switching_exam_can_resume_without_changes() {
    let mut session = ExamSession::new();
    let timer = started(&mut session, "developer", 5);
    answer_and_advance(&mut session, OptionLetter::B);
    session.tick(timer);
    let before_answers = session.attempt().unwrap().answers().clone();

    let outcome = session.request_exam(exam_type("cloud_practitioner"));
    assert_eq!(
        outcome,
        SelectOutcome::ConfirmSwitch {
            current: exam_type("developer"),
            requested: exam_type("cloud_practitioner"),
        }
    );
    assert_eq!(session.resolve_switch(SwitchChoice::Resume), Ok(SwitchOutcome::Resumed));

    let attempt = session.attempt().unwrap();
    assert_eq!(attempt.rules().exam_type, exam_type("developer"));
    assert_eq!(attempt.index(), 1);
    assert_eq!(attempt.answers(), &before_answers);
    assert_eq!(session.pending_switch(), None);
}

#[test]
fn switching_exam_and_abandoning_loads_new_type() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 5);
    session.request_exam(exam_type("cloud_practitioner"));

    let SwitchOutcome::Load(ticket) = session.resolve_switch(SwitchChoice::Abandon).unwrap() else {
        panic!("expected a load");
    };
    assert_eq!(
        session.locked_exam_type(),
        Some(&exam_type("cloud_practitioner"))
    );
    assert!(matches!(
        session.content_loaded(ticket, rules("cloud_practitioner", 90), questions(2)),
        LoadOutcome::Started(_)
    ));
}

#[test]
fn abandoning_through_a_switch_leaves_no_trace_of_the_old_attempt() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 5);
    answer_and_advance(&mut session, OptionLetter::A);
    answer_and_advance(&mut session, OptionLetter::B);
    session.request_exam(exam_type("cloud_practitioner"));

    let SwitchOutcome::Load(ticket) = session.resolve_switch(SwitchChoice::Abandon).unwrap() else {
        panic!("expected a load");
    };
    assert_eq!(session.kind(), StateKind::Loading);
    assert!(session.attempt().is_none());
    assert_eq!(session.pending_switch(), None);

    session.content_loaded(ticket, rules("cloud_practitioner", 90), questions(2));
    let attempt = session.attempt().unwrap();
    assert_eq!(attempt.rules().exam_type, exam_type("cloud_practitioner"));
    assert_eq!(attempt.index(), 0);
    assert_eq!(attempt.answers().len(), 1);
    assert_eq!(attempt.score().correct, 0);
}

#[test]
fn requesting_same_exam_is_a_no_op() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 2);
    assert_eq!(
        session.request_exam(exam_type("developer")),
        SelectOutcome::AlreadyActive
    );
    assert_eq!(
        session.resolve_switch(SwitchChoice::Resume),
        Err(SessionActionError::NoPendingSwitch)
    );
}

#[test]
fn abandon_clears_lock_and_reports_partial_score() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 4);
    answer_and_advance(&mut session, OptionLetter::A);

    let partial = session.abandon().unwrap();
    assert_eq!(partial.correct, 1);
    assert_eq!(partial.total, 4);
    assert_eq!(session.kind(), StateKind::Idle);
    assert!(!session.is_locked());
    assert!(matches!(
        session.request_exam(exam_type("cloud_practitioner")),
        SelectOutcome::Load(_)
    ));
}

#[test]
fn finishing_enters_review_and_releases_lock() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 2);
    answer_and_advance(&mut session, OptionLetter::A);
    assert_eq!(
        answer_and_advance(&mut session, OptionLetter::B),
        AdvanceOutcome::Review
    );

    assert_eq!(session.kind(), StateKind::ReviewMode);
    assert!(!session.is_locked());
    let score = session.score().unwrap();
    assert_eq!((score.correct, score.incorrect, score.percentage), (1, 1, 50));
    assert_eq!(
        session.certificate_decision(),
        Some(CertificateDecision::NotPassed)
    );
}

#[test]
fn review_navigates_reached_questions_only() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 3);
    answer_and_advance(&mut session, OptionLetter::A);
    answer_and_advance(&mut session, OptionLetter::B);
    answer_and_advance(&mut session, OptionLetter::A);

    let item = session.review_question(1).unwrap();
    assert_eq!(item.question.id(), QuestionId::new(2));
    assert_eq!(item.record.selected, Some(OptionLetter::B));
    assert_eq!(session.completed().unwrap().cursor(), 1);
    assert_eq!(
        session.review_question(7).unwrap_err(),
        SessionActionError::NotReached { index: 7 }
    );
}

#[test]
fn restart_and_close_only_apply_in_review() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 1);
    assert!(session.restart().is_err());
    assert!(session.close().is_err());

    answer_and_advance(&mut session, OptionLetter::A);
    let ticket = session.restart().unwrap();
    assert_eq!(session.kind(), StateKind::Loading);
    session.content_loaded(ticket, rules("developer", 90), questions(1));
    answer_and_advance(&mut session, OptionLetter::A);

    session.close().unwrap();
    assert_eq!(session.kind(), StateKind::Idle);
}

#[test]
fn certificate_needs_sign_in_and_finish() {
    let mut session = ExamSession::new();
    started(&mut session, "developer", 2);
    answer_and_advance(&mut session, OptionLetter::A);
    assert_eq!(
        session.certificate_decision(),
        Some(CertificateDecision::Incomplete)
    );
    answer_and_advance(&mut session, OptionLetter::A);
    assert_eq!(
        session.certificate_decision(),
        Some(CertificateDecision::SignInRequired)
    );
    session.set_authenticated(true);
    assert_eq!(
        session.certificate_decision(),
        Some(CertificateDecision::Eligible)
    );
}
