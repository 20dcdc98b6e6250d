//! Pass/fail to certificate: eligibility rules and the optional feedback step before issuance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ExamId, ExamType};
use crate::scoring::ScoreSnapshot;

/// How an attempt ended, as far as certification cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    InProgress,
    Finished,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateDecision {
    Eligible,
    NotPassed,
    Incomplete,
    SignInRequired,
}

/// A certificate needs a pass, a normally completed attempt and a signed-in user.
#[must_use]
pub fn certificate_decision(
    score: &ScoreSnapshot,
    completion: Completion,
    authenticated: bool,
) -> CertificateDecision {
    if completion != Completion::Finished {
        return CertificateDecision::Incomplete;
    }
    if !score.passed {
        return CertificateDecision::NotPassed;
    }
    if !authenticated {
        return CertificateDecision::SignInRequired;
    }
    CertificateDecision::Eligible
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateGrant {
    pub exam_id: ExamId,
    pub exam_type: ExamType,
    pub exam_name: String,
    pub holder: String,
    pub percentage: u8,
    pub correct: u32,
    pub total: u32,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feedback {
    NotRequested,
    Pending,
    Submitted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateStep<'a> {
    RequestFeedback,
    Issue(&'a CertificateGrant),
}

/// Issuance of one certificate. A feedback prompt may sit in front of it, but both answering and
/// declining the prompt release the certificate.
#[derive(Debug, Clone)]
pub struct CertificateFlow {
    grant: CertificateGrant,
    feedback: Feedback,
}

impl CertificateFlow {
    /// # Errors
    ///
    /// Returns the decision itself when it is anything other than `Eligible`.
    pub fn begin(
        decision: CertificateDecision,
        grant: CertificateGrant,
        request_feedback: bool,
    ) -> Result<Self, CertificateDecision> {
        if decision != CertificateDecision::Eligible {
            return Err(decision);
        }
        let feedback = if request_feedback {
            Feedback::Pending
        } else {
            Feedback::NotRequested
        };
        Ok(Self { grant, feedback })
    }

    #[must_use]
    pub fn next_step(&self) -> CertificateStep<'_> {
        match self.feedback {
            Feedback::Pending => CertificateStep::RequestFeedback,
            Feedback::NotRequested | Feedback::Submitted | Feedback::Declined => {
                CertificateStep::Issue(&self.grant)
            }
        }
    }

    pub fn feedback_submitted(&mut self) {
        if self.feedback == Feedback::Pending {
            self.feedback = Feedback::Submitted;
        }
    }

    pub fn feedback_declined(&mut self) {
        if self.feedback == Feedback::Pending {
            self.feedback = Feedback::Declined;
        }
    }

    #[must_use]
    pub fn feedback_given(&self) -> bool {
        self.feedback == Feedback::Submitted
    }

    /// Hands over the grant once the feedback prompt, if any, has been answered or declined.
    ///
    /// # Errors
    ///
    /// Returns the flow unchanged while the feedback prompt is still open.
    pub fn issue(self) -> Result<CertificateGrant, Self> {
        match self.feedback {
            Feedback::Pending => Err(self),
            _ => Ok(self.grant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AnswerRecord;
    use crate::model::OptionLetter;
    use crate::time::fixed_now;

    fn score(correct: usize, total: usize) -> ScoreSnapshot {
        let records: Vec<_> = (0..total)
            .map(|i| AnswerRecord::answered(OptionLetter::A, i < correct))
            .collect();
        ScoreSnapshot::compute(&records, total, 70)
    }

    fn grant() -> CertificateGrant {
        CertificateGrant {
            exam_id: ExamId::new(1),
            exam_type: ExamType::parse("developer").unwrap(),
            exam_name: "Developer Associate".into(),
            holder: "Sam".into(),
            percentage: 80,
            correct: 40,
            total: 50,
            issued_at: fixed_now(),
        }
    }

    #[test]
    fn eligibility_requires_pass_completion_and_sign_in() {
        let pass = score(40, 50);
        let fail = score(5, 50);
        assert_eq!(
            certificate_decision(&pass, Completion::Finished, true),
            CertificateDecision::Eligible
        );
        assert_eq!(
            certificate_decision(&pass, Completion::Finished, false),
            CertificateDecision::SignInRequired
        );
        assert_eq!(
            certificate_decision(&pass, Completion::Abandoned, true),
            CertificateDecision::Incomplete
        );
        assert_eq!(
            certificate_decision(&fail, Completion::Finished, true),
            CertificateDecision::NotPassed
        );
    }

    #[test]
    fn ineligible_flow_does_not_start() {
        let err = CertificateFlow::begin(CertificateDecision::NotPassed, grant(), true).unwrap_err();
        assert_eq!(err, CertificateDecision::NotPassed);
    }

    #[test]
    fn feedback_prompt_holds_issuance_until_answered() {
        let mut flow = CertificateFlow::begin(CertificateDecision::Eligible, grant(), true).unwrap();
        assert_eq!(flow.next_step(), CertificateStep::RequestFeedback);
        let flow_back = flow.clone().issue().unwrap_err();
        assert_eq!(flow_back.next_step(), CertificateStep::RequestFeedback);

        flow.feedback_submitted();
        assert!(flow.feedback_given());
        assert_eq!(flow.issue().unwrap().percentage, 80);
    }

    #[test]
    fn declining_feedback_still_issues() {
        let mut flow = CertificateFlow::begin(CertificateDecision::Eligible, grant(), true).unwrap();
        flow.feedback_declined();
        assert!(matches!(flow.next_step(), CertificateStep::Issue(_)));
        assert!(!flow.feedback_given());
        assert!(flow.issue().is_ok());
    }

    #[test]
    fn no_prompt_issues_immediately() {
        let flow = CertificateFlow::begin(CertificateDecision::Eligible, grant(), false).unwrap();
        assert!(matches!(flow.next_step(), CertificateStep::Issue(g) if g.holder == "Sam"));
    }
}
