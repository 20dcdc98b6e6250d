use std::sync::Arc;

use certprep_core::Clock;
use certprep_core::model::{Exam, ExamId, ExamType, Question};
use storage::repository::{ExamRepository, QuestionFilter, QuestionRepository, StorageError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::policy::{EnrichmentDecision, EnrichmentPolicy};
use super::sampler::Sampler;
use crate::config::PoolSettings;
use crate::error::{GeneratorError, PoolError};
use crate::generation::{GenerationRequest, QuestionGenerator};
use crate::random::RandomSource;

pub const DEFAULT_QUESTION_PAGE: u32 = 100;
pub const MAX_QUESTION_PAGE: u32 = 500;

/// An exam together with the current size of its pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSummary {
    pub exam: Exam,
    pub question_count: u32,
}

/// Caller-supplied knobs for one enrichment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOptions {
    /// Lower bound on the fill amount when the pool is below target.
    pub requested: Option<u32>,
    pub domain: Option<String>,
    pub use_external_provider: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            requested: None,
            domain: None,
            use_external_provider: true,
        }
    }
}

/// What one enrichment pass did to a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub exam_id: ExamId,
    pub decision: EnrichmentDecision,
    pub target: u32,
    pub before: u32,
    pub created: u32,
    pub duplicates: u32,
    pub invalid: u32,
    pub total: u32,
    pub failure: Option<String>,
    pub timed_out: bool,
}

impl EnrichmentReport {
    fn new(exam_id: ExamId, decision: EnrichmentDecision, target: u32, before: u32) -> Self {
        Self {
            exam_id,
            decision,
            target,
            before,
            created: 0,
            duplicates: 0,
            invalid: 0,
            total: before,
            failure: None,
            timed_out: false,
        }
    }

    /// True when the policy decided not to generate anything.
    #[must_use]
    pub fn skipped(&self) -> bool {
        !self.decision.generates()
    }

    #[must_use]
    pub fn reason(&self) -> Option<String> {
        if self.skipped() {
            return Some(format!(
                "pool has {} questions (target {}); enrichment not triggered",
                self.before, self.target
            ));
        }
        self.failure.clone()
    }
}

/// Questions drawn for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledQuestions {
    pub questions: Vec<Question>,
    pub pool_size: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct InsertTally {
    created: u32,
    duplicates: u32,
    invalid: u32,
}

#[derive(Debug, Error)]
enum EnrichError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Grows exam pools according to the enrichment policy and serves random samples from them.
#[derive(Clone)]
pub struct PoolService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    questions: Arc<dyn QuestionRepository>,
    generator: Arc<dyn QuestionGenerator>,
    rng: Arc<RandomSource>,
    sampler: Sampler,
    settings: PoolSettings,
}

impl PoolService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        questions: Arc<dyn QuestionRepository>,
        generator: Arc<dyn QuestionGenerator>,
        rng: Arc<RandomSource>,
        settings: PoolSettings,
    ) -> Self {
        let sampler = Sampler::new(Arc::clone(&rng));
        Self {
            clock,
            exams,
            questions,
            generator,
            rng,
            sampler,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Active exams with their pool sizes.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Storage` on repository failures.
    pub async fn list_exams(&self) -> Result<Vec<ExamSummary>, PoolError> {
        let exams = self.exams.list_exams(true).await?;
        let mut out = Vec::with_capacity(exams.len());
        for exam in exams {
            out.push(self.summarize(exam).await?);
        }
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns `PoolError::ExamNotFound` for unknown ids.
    pub async fn exam(&self, id: ExamId) -> Result<ExamSummary, PoolError> {
        let exam = self
            .exams
            .get_exam(id)
            .await?
            .ok_or(PoolError::ExamNotFound(id))?;
        self.summarize(exam).await
    }

    /// # Errors
    ///
    /// Returns `PoolError::UnknownExamType` when no active exam has this type.
    pub async fn exam_by_type(&self, exam_type: &ExamType) -> Result<ExamSummary, PoolError> {
        let exam = self
            .exams
            .exam_by_type(exam_type)
            .await?
            .filter(Exam::is_active)
            .ok_or_else(|| PoolError::UnknownExamType(exam_type.clone()))?;
        self.summarize(exam).await
    }

    /// Browses stored questions, oldest first. An `exam_id` in the filter must exist.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ZeroLimit` for `Some(0)` and `PoolError::ExamNotFound` when the
    /// filtered exam does not exist.
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
        limit: Option<u32>,
    ) -> Result<Vec<Question>, PoolError> {
        let limit = match limit {
            Some(0) => return Err(PoolError::ZeroLimit),
            Some(limit) => limit.min(MAX_QUESTION_PAGE),
            None => DEFAULT_QUESTION_PAGE,
        };
        if let Some(exam_id) = filter.exam_id {
            if self.exams.get_exam(exam_id).await?.is_none() {
                return Err(PoolError::ExamNotFound(exam_id));
            }
        }
        Ok(self.questions.list_questions(filter, limit).await?)
    }

    /// Applies the enrichment policy to `exam`'s pool.
    ///
    /// Generation runs in its own task bounded by the configured timeout. A timed-out task is
    /// not cancelled; it finishes in the background and its questions land in the pool.
    /// Generator failures and timeouts are folded into the report.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Storage` only when the pool cannot be counted.
    pub async fn enrich(
        &self,
        exam: &Exam,
        options: EnrichOptions,
    ) -> Result<EnrichmentReport, PoolError> {
        let before = self.questions.count_questions(exam.id()).await?;
        let policy = self.policy_for(exam);
        let decision = policy.decide(before, options.requested, &self.rng);
        info!(exam_id = %exam.id(), before, ?decision, "enrichment decision");

        let mut report =
            EnrichmentReport::new(exam.id(), decision, policy.target_pool_size(), before);
        if !decision.generates() {
            return Ok(report);
        }

        let request = GenerationRequest {
            exam_name: exam.name().to_owned(),
            exam_type: exam.exam_type().clone(),
            count: decision.count(),
            domain: options.domain,
            use_external_provider: options.use_external_provider,
        };
        let task = tokio::spawn(generate_and_store(
            Arc::clone(&self.generator),
            Arc::clone(&self.questions),
            self.clock,
            exam.id(),
            request,
        ));

        let timeout = self.settings.generation_timeout();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(tally))) => {
                report.created = tally.created;
                report.duplicates = tally.duplicates;
                report.invalid = tally.invalid;
                info!(
                    exam_id = %exam.id(),
                    created = tally.created,
                    duplicates = tally.duplicates,
                    invalid = tally.invalid,
                    "pool enriched"
                );
            }
            Ok(Ok(Err(error))) => {
                warn!(exam_id = %exam.id(), %error, "question generation failed");
                report.failure = Some(error.to_string());
            }
            Ok(Err(error)) => {
                warn!(exam_id = %exam.id(), %error, "question generation task aborted");
                report.failure = Some(error.to_string());
            }
            Err(_) => {
                let error = GeneratorError::Timeout(timeout);
                warn!(exam_id = %exam.id(), %error, "falling back to the existing pool");
                report.failure = Some(error.to_string());
                report.timed_out = true;
            }
        }

        report.total = self.questions.count_questions(exam.id()).await?;
        Ok(report)
    }

    /// Draws up to `limit` distinct questions (default sample size when `None`).
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ZeroLimit` for `Some(0)`, `PoolError::ExamNotFound` for unknown exams
    /// and `PoolError::ContentUnavailable` when the pool is empty.
    pub async fn sample(
        &self,
        exam_id: ExamId,
        limit: Option<u32>,
    ) -> Result<SampledQuestions, PoolError> {
        if limit == Some(0) {
            return Err(PoolError::ZeroLimit);
        }
        if self.exams.get_exam(exam_id).await?.is_none() {
            return Err(PoolError::ExamNotFound(exam_id));
        }
        let ids = self.questions.question_ids(exam_id).await?;
        if ids.is_empty() {
            warn!(%exam_id, "no questions available");
            return Err(PoolError::ContentUnavailable { exam_id });
        }

        let size = limit.unwrap_or(self.settings.default_sample_size()) as usize;
        let picked = self.sampler.draw(&ids, size);
        let questions = self.questions.get_questions(exam_id, &picked).await?;
        debug!(%exam_id, pool = ids.len(), drawn = questions.len(), "sampled questions");

        Ok(SampledQuestions {
            questions,
            pool_size: u32::try_from(ids.len()).unwrap_or(u32::MAX),
        })
    }

    /// Enrichment followed by sampling, for an exam picked by type.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::UnknownExamType`, or `PoolError::ContentUnavailable` when the pool is
    /// still empty after enrichment.
    pub async fn prepare_session(
        &self,
        exam_type: &ExamType,
        limit: Option<u32>,
    ) -> Result<(Exam, EnrichmentReport, SampledQuestions), PoolError> {
        let summary = self.exam_by_type(exam_type).await?;
        let report = self.enrich(&summary.exam, EnrichOptions::default()).await?;
        let sample = self.sample(summary.exam.id(), limit).await?;
        Ok((summary.exam, report, sample))
    }

    /// Starts enrichment for `exam_type` in a detached task and returns without waiting.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::UnknownExamType` when no active exam has this type.
    pub async fn pre_generate(
        &self,
        exam_type: &ExamType,
        requested: Option<u32>,
    ) -> Result<ExamSummary, PoolError> {
        let summary = self.exam_by_type(exam_type).await?;
        let service = self.clone();
        let exam = summary.exam.clone();
        tokio::spawn(async move {
            let options = EnrichOptions {
                requested,
                ..EnrichOptions::default()
            };
            if let Err(error) = service.enrich(&exam, options).await {
                warn!(exam_id = %exam.id(), %error, "pre-generation failed");
            }
        });
        Ok(summary)
    }

    fn policy_for(&self, exam: &Exam) -> EnrichmentPolicy {
        let target = self
            .settings
            .target_pool_size()
            .unwrap_or_else(|| exam.settings().target_pool_size());
        EnrichmentPolicy::new(
            target,
            self.settings.enrichment_probability(),
            self.settings.min_enrichment_batch(),
        )
    }

    async fn summarize(&self, exam: Exam) -> Result<ExamSummary, PoolError> {
        let question_count = self.questions.count_questions(exam.id()).await?;
        Ok(ExamSummary {
            exam,
            question_count,
        })
    }
}

async fn generate_and_store(
    generator: Arc<dyn QuestionGenerator>,
    questions: Arc<dyn QuestionRepository>,
    clock: Clock,
    exam_id: ExamId,
    request: GenerationRequest,
) -> Result<InsertTally, EnrichError> {
    let candidates = generator.generate(&request).await?;
    let mut tally = InsertTally::default();

    for candidate in candidates {
        if tally.created >= request.count {
            break;
        }
        let validated = match candidate
            .normalize(exam_id)
            .and_then(|draft| draft.validate(clock.now()))
        {
            Ok(validated) => validated,
            Err(error) => {
                debug!(%exam_id, %error, "discarding malformed generated question");
                tally.invalid += 1;
                continue;
            }
        };
        match questions.insert_question(validated).await {
            Ok(_) => tally.created += 1,
            Err(StorageError::Conflict) => {
                debug!(%exam_id, "discarding duplicate generated question");
                tally.duplicates += 1;
            }
            Err(error) => return Err(error.into()),
        }
    }

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::RawQuestion;
    use crate::generation::RawOption;
    use async_trait::async_trait;
    use certprep_core::model::ExamSettings;
    use certprep_core::time::{fixed_clock, fixed_now};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use storage::repository::{InMemoryRepository, NewExamRecord};

    /// Numbers questions with a running counter so every call yields fresh text.
    #[derive(Default)]
    struct CountingGenerator {
        next: AtomicU32,
        calls: AtomicU32,
    }

    fn raw(text: String) -> RawQuestion {
        RawQuestion {
            question_text: Some(text),
            options: vec![
                RawOption {
                    letter: Some("A".into()),
                    text: Some("right".into()),
                    is_correct: true,
                },
                RawOption {
                    letter: Some("B".into()),
                    text: Some("wrong".into()),
                    is_correct: false,
                },
            ],
            ..RawQuestion::default()
        }
    }

    #[async_trait]
    impl QuestionGenerator for CountingGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Vec<RawQuestion>, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..request.count)
                .map(|_| {
                    let n = self.next.fetch_add(1, Ordering::SeqCst);
                    raw(format!("Generated question {n}"))
                })
                .collect())
        }
    }

    /// Always returns the same two questions plus one malformed entry.
    struct RepeatingGenerator;

    #[async_trait]
    impl QuestionGenerator for RepeatingGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<RawQuestion>, GeneratorError> {
            Ok(vec![
                raw("Same one".into()),
                raw("Same two".into()),
                RawQuestion::default(),
            ])
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl QuestionGenerator for FailingGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<RawQuestion>, GeneratorError> {
            Err(GeneratorError::NotConfigured)
        }
    }

    async fn service_with(
        generator: Arc<dyn QuestionGenerator>,
        probability: f64,
    ) -> (PoolService, Exam) {
        let repo = InMemoryRepository::new();
        let exam = repo
            .insert_new_exam(NewExamRecord {
                name: "AWS Developer Associate".into(),
                exam_type: ExamType::parse("developer").unwrap(),
                description: String::new(),
                settings: ExamSettings::default(),
                is_active: true,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let settings =
            PoolSettings::new(probability, 10, None, Duration::from_secs(60), 50).unwrap();
        let service = PoolService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo),
            generator,
            Arc::new(RandomSource::seeded(11)),
            settings,
        );
        (service, exam)
    }

    #[tokio::test]
    async fn empty_pool_is_filled_to_target() {
        let (service, exam) = service_with(Arc::new(CountingGenerator::default()), 0.15).await;
        let report = service.enrich(&exam, EnrichOptions::default()).await.unwrap();
        assert_eq!(report.decision, EnrichmentDecision::Fill { count: 100 });
        assert_eq!(report.created, 100);
        assert_eq!(report.total, 100);
        assert!(!report.skipped());
    }

    #[tokio::test]
    async fn full_pool_never_shrinks() {
        let (service, exam) = service_with(Arc::new(CountingGenerator::default()), 0.5).await;
        service.enrich(&exam, EnrichOptions::default()).await.unwrap();

        let mut last = 100;
        for _ in 0..30 {
            let report = service.enrich(&exam, EnrichOptions::default()).await.unwrap();
            assert!(report.total >= last);
            if report.skipped() {
                assert!(report.reason().unwrap().contains("not triggered"));
            } else {
                assert!((10..=20).contains(&report.created));
            }
            last = report.total;
        }
    }

    #[tokio::test]
    async fn duplicates_and_malformed_entries_are_not_counted() {
        let (service, exam) = service_with(Arc::new(RepeatingGenerator), 0.15).await;
        let first = service.enrich(&exam, EnrichOptions::default()).await.unwrap();
        assert_eq!((first.created, first.duplicates, first.invalid), (2, 0, 1));

        let second = service.enrich(&exam, EnrichOptions::default()).await.unwrap();
        assert_eq!((second.created, second.duplicates), (0, 2));
        assert_eq!(second.total, 2);
    }

    #[tokio::test]
    async fn generation_failure_on_empty_pool_is_content_unavailable() {
        let (service, exam) = service_with(Arc::new(FailingGenerator), 0.15).await;
        let report = service.enrich(&exam, EnrichOptions::default()).await.unwrap();
        assert!(report.failure.is_some());
        assert_eq!(report.total, 0);

        let err = service.sample(exam.id(), None).await.unwrap_err();
        assert!(matches!(err, PoolError::ContentUnavailable { .. }));
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_even_with_a_full_pool() {
        let (service, exam) = service_with(Arc::new(CountingGenerator::default()), 0.15).await;
        service.enrich(&exam, EnrichOptions::default()).await.unwrap();

        let err = service.sample(exam.id(), Some(0)).await.unwrap_err();
        assert!(matches!(err, PoolError::ZeroLimit));
        assert_eq!(service.sample(exam.id(), Some(1)).await.unwrap().questions.len(), 1);
    }

    #[tokio::test]
    async fn question_listing_checks_the_exam_and_caps_the_page() {
        let (service, exam) = service_with(Arc::new(CountingGenerator::default()), 0.15).await;
        service.enrich(&exam, EnrichOptions::default()).await.unwrap();

        let filter = QuestionFilter {
            exam_id: Some(exam.id()),
            ..QuestionFilter::default()
        };
        assert_eq!(service.list_questions(&filter, None).await.unwrap().len(), 100);
        assert_eq!(service.list_questions(&filter, Some(7)).await.unwrap().len(), 7);
        assert!(matches!(
            service.list_questions(&filter, Some(0)).await,
            Err(PoolError::ZeroLimit)
        ));

        let missing = QuestionFilter {
            exam_id: Some(ExamId::new(999)),
            ..QuestionFilter::default()
        };
        assert!(matches!(
            service.list_questions(&missing, None).await,
            Err(PoolError::ExamNotFound(_))
        ));
    }

    #[tokio::test]
    async fn prepare_session_samples_distinct_questions() {
        let (service, _) = service_with(Arc::new(CountingGenerator::default()), 0.15).await;
        let exam_type = ExamType::parse("developer").unwrap();
        let (_, report, sample) = service.prepare_session(&exam_type, Some(50)).await.unwrap();

        assert_eq!(report.total, 100);
        assert_eq!(sample.pool_size, 100);
        assert_eq!(sample.questions.len(), 50);
        let mut ids: Vec<_> = sample.questions.iter().map(Question::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn unknown_exam_type_is_reported() {
        let (service, _) = service_with(Arc::new(CountingGenerator::default()), 0.15).await;
        let err = service
            .exam_by_type(&ExamType::parse("sysops").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::UnknownExamType(_)));
    }
}
