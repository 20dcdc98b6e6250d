use std::path::Path;
use std::sync::Arc;

use certprep_core::Clock;
use certprep_core::model::ExamType;
use storage::repository::{ExamRepository, QuestionRepository, StorageError};
use tracing::{debug, info};

use crate::error::ImportError;
use crate::generation::RawQuestion;

/// Outcome of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: u32,
    pub duplicates: u32,
    pub invalid: u32,
}

impl ImportReport {
    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.duplicates + self.invalid
    }
}

/// Bulk-loads question files into an exam's pool.
#[derive(Clone)]
pub struct ImportService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl ImportService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            clock,
            exams,
            questions,
        }
    }

    /// # Errors
    ///
    /// Returns `ImportError::Io` if the file cannot be read, otherwise as [`Self::import_json`].
    pub async fn import_file(
        &self,
        exam_type: &ExamType,
        path: impl AsRef<Path>,
    ) -> Result<ImportReport, ImportError> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        self.import_json(exam_type, &json).await
    }

    /// Imports a JSON array of questions. Questions whose text already exists in the exam are
    /// skipped, as are entries that do not decode or fail validation.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Json` for anything but an array of question objects,
    /// `ImportError::UnknownExamType` when the exam does not exist, or storage failures.
    pub async fn import_json(
        &self,
        exam_type: &ExamType,
        json: &str,
    ) -> Result<ImportReport, ImportError> {
        let items: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let exam = self
            .exams
            .exam_by_type(exam_type)
            .await?
            .ok_or_else(|| ImportError::UnknownExamType(exam_type.clone()))?;

        let now = self.clock.now();
        let mut report = ImportReport::default();
        for (position, decoded) in RawQuestion::decode_each(items).into_iter().enumerate() {
            let candidate = match decoded {
                Ok(candidate) => candidate,
                Err(error) => {
                    debug!(position, %error, "skipping undecodable question");
                    report.invalid += 1;
                    continue;
                }
            };
            let validated = match candidate
                .normalize(exam.id())
                .and_then(|draft| draft.validate(now))
            {
                Ok(validated) => validated,
                Err(error) => {
                    debug!(position, %error, "skipping invalid question");
                    report.invalid += 1;
                    continue;
                }
            };
            match self.questions.insert_question(validated).await {
                Ok(_) => report.imported += 1,
                Err(StorageError::Conflict) => report.duplicates += 1,
                Err(error) => return Err(error.into()),
            }
        }

        info!(
            %exam_type,
            imported = report.imported,
            skipped = report.skipped(),
            "questions imported"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ensure_default_exams;
    use certprep_core::model::ExamSettings;
    use certprep_core::time::fixed_clock;
    use storage::repository::Storage;

    const FILE: &str = r#"[
        {"question_text": "Which service is serverless compute?",
         "options": [{"letter": "A", "text": "Lambda", "is_correct": true},
                     {"letter": "B", "text": "EC2"}],
         "difficulty": "easy"},
        {"question": "Which service is a CDN?",
         "answers": [{"text": "CloudFront"}, {"text": "Route 53"}],
         "correct_answer_letter": "A"},
        {"question_text": "Which service is serverless compute?",
         "options": [{"text": "Lambda", "is_correct": true}]},
        {"question_text": "   ", "options": []}
    ]"#;

    async fn service() -> (ImportService, Storage) {
        let storage = Storage::in_memory();
        ensure_default_exams(storage.exams.as_ref(), fixed_clock(), ExamSettings::default())
            .await
            .unwrap();
        let service = ImportService::new(
            fixed_clock(),
            Arc::clone(&storage.exams),
            Arc::clone(&storage.questions),
        );
        (service, storage)
    }

    #[tokio::test]
    async fn import_skips_duplicates_and_invalid_entries() {
        let (service, storage) = service().await;
        let exam_type = ExamType::parse("developer").unwrap();
        let report = service.import_json(&exam_type, FILE).await.unwrap();

        assert_eq!(
            report,
            ImportReport {
                imported: 2,
                duplicates: 1,
                invalid: 1
            }
        );
        let exam = storage.exams.exam_by_type(&exam_type).await.unwrap().unwrap();
        assert_eq!(storage.questions.count_questions(exam.id()).await.unwrap(), 2);

        let again = service.import_json(&exam_type, FILE).await.unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped(), 4);
    }

    #[tokio::test]
    async fn undecodable_entries_are_counted_not_fatal() {
        let (service, _) = service().await;
        let file = r#"[
            {"question_text": "Which service stores objects?",
             "options": [{"text": "S3", "is_correct": true}, {"text": "EBS"}]},
            {"question_text": "Broken flag",
             "options": [{"text": "S3", "is_correct": null}]},
            42
        ]"#;
        let report = service
            .import_json(&ExamType::parse("developer").unwrap(), file)
            .await
            .unwrap();
        assert_eq!((report.imported, report.invalid), (1, 2));
    }

    #[tokio::test]
    async fn import_rejects_non_arrays_and_unknown_exams() {
        let (service, _) = service().await;
        let developer = ExamType::parse("developer").unwrap();
        let err = service.import_json(&developer, "{}").await.unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));

        let sysops = ExamType::parse("sysops").unwrap();
        let err = service.import_json(&sysops, "[]").await.unwrap_err();
        assert!(matches!(err, ImportError::UnknownExamType(_)));
    }
}
