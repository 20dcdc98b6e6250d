use async_trait::async_trait;
use certprep_core::model::{
    Difficulty, Exam, ExamId, ExamSettings, ExamType, Question, QuestionId, Review, ReviewId,
    ValidatedQuestion, ValidatedReview,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Exam fields before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExamRecord {
    pub name: String,
    pub exam_type: ExamType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: ExamSettings,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl NewExamRecord {
    pub(crate) fn into_exam(self, id: ExamId) -> Result<Exam, StorageError> {
        Exam::new(
            id,
            self.name,
            self.exam_type,
            self.description,
            self.settings,
            self.created_at,
        )
        .map(|exam| exam.with_active(self.is_active))
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for exams.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist a new exam and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an exam with the same type exists.
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<Exam, StorageError>;

    /// Persist or update an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing exam is `Ok(None)`.
    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing exam is `Ok(None)`.
    async fn exam_by_type(&self, exam_type: &ExamType) -> Result<Option<Exam>, StorageError>;

    /// Exams ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_exams(&self, active_only: bool) -> Result<Vec<Exam>, StorageError>;
}

/// Narrows a question listing. `None` matches everything; `domain` must match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub exam_id: Option<ExamId>,
    pub domain: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionFilter {
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        self.exam_id.is_none_or(|id| question.exam_id() == id)
            && self.domain.as_deref().is_none_or(|d| question.domain() == d)
            && self.difficulty.is_none_or(|d| question.difficulty() == d)
    }
}

/// Repository contract for the per-exam question pool. Questions are only ever appended.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_questions(&self, exam_id: ExamId) -> Result<u32, StorageError>;

    /// Every question id in the exam's pool, ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn question_ids(&self, exam_id: ExamId) -> Result<Vec<QuestionId>, StorageError>;

    /// Fetch questions of one exam by id, in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any are missing, or other storage errors.
    async fn get_questions(
        &self,
        exam_id: ExamId,
        ids: &[QuestionId],
    ) -> Result<Vec<Question>, StorageError>;

    /// Append a question to its exam's pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the exam already holds a question with exactly the
    /// same text, `StorageError::NotFound` if the exam does not exist.
    async fn insert_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError>;

    /// Up to `limit` questions matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for post-exam reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already reviewed this exam.
    async fn append_review(&self, review: ValidatedReview) -> Result<Review, StorageError>;

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_reviews(&self, exam_id: ExamId, limit: u32) -> Result<Vec<Review>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<HashMap<ExamId, Exam>>>,
    questions: Arc<Mutex<Vec<Question>>>,
    reviews: Arc<Mutex<Vec<Review>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<Exam, StorageError> {
        let mut guard = self.exams.lock().map_err(lock_err)?;
        if guard.values().any(|e| *e.exam_type() == exam.exam_type) {
            return Err(StorageError::Conflict);
        }
        let next = guard.keys().map(ExamId::value).max().unwrap_or(0) + 1;
        let exam = exam.into_exam(ExamId::new(next))?;
        guard.insert(exam.id(), exam.clone());
        Ok(exam)
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(lock_err)?;
        if guard
            .values()
            .any(|e| e.id() != exam.id() && e.exam_type() == exam.exam_type())
        {
            return Err(StorageError::Conflict);
        }
        guard.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn exam_by_type(&self, exam_type: &ExamType) -> Result<Option<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(lock_err)?;
        Ok(guard.values().find(|e| e.exam_type() == exam_type).cloned())
    }

    async fn list_exams(&self, active_only: bool) -> Result<Vec<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(lock_err)?;
        let mut exams: Vec<Exam> = guard
            .values()
            .filter(|e| !active_only || e.is_active())
            .cloned()
            .collect();
        exams.sort_by_key(Exam::id);
        Ok(exams)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn count_questions(&self, exam_id: ExamId) -> Result<u32, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let count = guard.iter().filter(|q| q.exam_id() == exam_id).count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn question_ids(&self, exam_id: ExamId) -> Result<Vec<QuestionId>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .filter(|q| q.exam_id() == exam_id)
            .map(Question::id)
            .collect())
    }

    async fn get_questions(
        &self,
        exam_id: ExamId,
        ids: &[QuestionId],
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.iter().find(|q| q.id() == *id && q.exam_id() == exam_id) {
                Some(question) => found.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }

    async fn insert_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError> {
        if !self.exams.lock().map_err(lock_err)?.contains_key(&question.exam_id) {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.questions.lock().map_err(lock_err)?;
        if guard
            .iter()
            .any(|q| q.exam_id() == question.exam_id && q.text() == question.text)
        {
            return Err(StorageError::Conflict);
        }
        let next = u64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("question id overflow".into()))?
            + 1;
        let question = question.assign_id(QuestionId::new(next));
        guard.push(question.clone());
        Ok(question)
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .filter(|q| filter.matches(q))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository {
    async fn append_review(&self, review: ValidatedReview) -> Result<Review, StorageError> {
        let mut guard = self.reviews.lock().map_err(lock_err)?;
        if guard
            .iter()
            .any(|r| r.exam_id() == review.exam_id && r.user_uid() == review.user_uid)
        {
            return Err(StorageError::Conflict);
        }
        let next = u64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("review id overflow".into()))?
            + 1;
        let review = review.assign_id(ReviewId::new(next));
        guard.push(review.clone());
        Ok(review)
    }

    async fn list_reviews(&self, exam_id: ExamId, limit: u32) -> Result<Vec<Review>, StorageError> {
        let guard = self.reviews.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .rev()
            .filter(|r| r.exam_id() == exam_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let reviews: Arc<dyn ReviewRepository> = Arc::new(repo);
        Self {
            exams,
            questions,
            reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certprep_core::model::{
        AnswerOption, Difficulty, OptionLetter, QuestionDraft, ReviewDraft,
    };
    use certprep_core::time::fixed_now;

    fn new_exam(slug: &str) -> NewExamRecord {
        NewExamRecord {
            name: format!("Exam {slug}"),
            exam_type: ExamType::parse(slug).unwrap(),
            description: String::new(),
            settings: ExamSettings::default(),
            is_active: true,
            created_at: fixed_now(),
        }
    }

    fn question(exam_id: ExamId, text: &str) -> ValidatedQuestion {
        QuestionDraft {
            exam_id,
            text: text.into(),
            domain: "Storage".into(),
            difficulty: Difficulty::Easy,
            explanation: String::new(),
            options: vec![
                AnswerOption::new(OptionLetter::A, "S3"),
                AnswerOption::new(OptionLetter::B, "EBS"),
            ],
            correct: OptionLetter::A,
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn exam_types_are_unique() {
        let repo = InMemoryRepository::new();
        let exam = repo.insert_new_exam(new_exam("developer")).await.unwrap();
        assert_eq!(exam.id(), ExamId::new(1));
        assert!(matches!(
            repo.insert_new_exam(new_exam("developer")).await,
            Err(StorageError::Conflict)
        ));
        let by_type = repo
            .exam_by_type(&ExamType::parse("developer").unwrap())
            .await
            .unwrap();
        assert_eq!(by_type.map(|e| e.id()), Some(exam.id()));
    }

    #[tokio::test]
    async fn duplicate_question_text_conflicts_per_exam() {
        let repo = InMemoryRepository::new();
        let dev = repo.insert_new_exam(new_exam("developer")).await.unwrap();
        let ops = repo.insert_new_exam(new_exam("sysops")).await.unwrap();

        repo.insert_question(question(dev.id(), "What is S3?"))
            .await
            .unwrap();
        assert!(matches!(
            repo.insert_question(question(dev.id(), "What is S3?")).await,
            Err(StorageError::Conflict)
        ));
        repo.insert_question(question(ops.id(), "What is S3?"))
            .await
            .unwrap();

        assert_eq!(repo.count_questions(dev.id()).await.unwrap(), 1);
        assert_eq!(repo.count_questions(ops.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_questions_keeps_requested_order() {
        let repo = InMemoryRepository::new();
        let dev = repo.insert_new_exam(new_exam("developer")).await.unwrap();
        for text in ["one", "two", "three"] {
            repo.insert_question(question(dev.id(), text)).await.unwrap();
        }
        let ids = repo.question_ids(dev.id()).await.unwrap();
        let reversed: Vec<_> = ids.iter().rev().copied().collect();
        let fetched = repo.get_questions(dev.id(), &reversed).await.unwrap();
        let texts: Vec<_> = fetched.iter().map(Question::text).collect();
        assert_eq!(texts, ["three", "two", "one"]);

        assert!(matches!(
            repo.get_questions(dev.id(), &[QuestionId::new(99)]).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn question_listing_applies_every_filter() {
        let repo = InMemoryRepository::new();
        let dev = repo.insert_new_exam(new_exam("developer")).await.unwrap();
        let ops = repo.insert_new_exam(new_exam("sysops")).await.unwrap();
        repo.insert_question(question(dev.id(), "easy storage")).await.unwrap();
        let mut hard = question(dev.id(), "hard security");
        hard.domain = "Security".into();
        hard.difficulty = Difficulty::Hard;
        repo.insert_question(hard).await.unwrap();
        repo.insert_question(question(ops.id(), "ops storage")).await.unwrap();

        let texts = |found: Vec<Question>| -> Vec<String> {
            found.iter().map(|q| q.text().to_owned()).collect()
        };
        let all = repo.list_questions(&QuestionFilter::default(), 10).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_exam = QuestionFilter {
            exam_id: Some(dev.id()),
            ..QuestionFilter::default()
        };
        assert_eq!(
            texts(repo.list_questions(&by_exam, 10).await.unwrap()),
            ["easy storage", "hard security"]
        );
        assert_eq!(repo.list_questions(&by_exam, 1).await.unwrap().len(), 1);

        let storage_only = QuestionFilter {
            domain: Some("Storage".into()),
            ..QuestionFilter::default()
        };
        assert_eq!(
            texts(repo.list_questions(&storage_only, 10).await.unwrap()),
            ["easy storage", "ops storage"]
        );

        let hard_dev = QuestionFilter {
            exam_id: Some(dev.id()),
            difficulty: Some(Difficulty::Hard),
            ..QuestionFilter::default()
        };
        assert_eq!(
            texts(repo.list_questions(&hard_dev, 10).await.unwrap()),
            ["hard security"]
        );
    }

    #[tokio::test]
    async fn one_review_per_user_and_exam() {
        let repo = InMemoryRepository::new();
        let dev = repo.insert_new_exam(new_exam("developer")).await.unwrap();
        let draft = ReviewDraft {
            exam_id: dev.id(),
            user_uid: "uid-1".into(),
            user_name: "Sam".into(),
            rating: 4,
            comment: "useful".into(),
            exam_score: Some(72),
            passed: Some(true),
        };
        repo.append_review(draft.clone().validate(fixed_now()).unwrap())
            .await
            .unwrap();
        assert!(matches!(
            repo.append_review(draft.validate(fixed_now()).unwrap()).await,
            Err(StorageError::Conflict)
        ));
        assert_eq!(repo.list_reviews(dev.id(), 10).await.unwrap().len(), 1);
    }
}
