//! The exams every installation starts with.

use certprep_core::Clock;
use certprep_core::model::{Exam, ExamSettings, ExamType};
use storage::repository::{ExamRepository, NewExamRecord};
use tracing::info;

use crate::error::AppServicesError;

/// Type slug, display name and description of each default exam.
pub const DEFAULT_EXAMS: [(&str, &str, &str); 3] = [
    (
        "solutions_architect",
        "AWS Solutions Architect",
        "Design resilient, high-performing, secure and cost-optimised architectures on AWS.",
    ),
    (
        "cloud_practitioner",
        "AWS Cloud Practitioner",
        "Cloud concepts, core AWS services, security, billing and pricing.",
    ),
    (
        "developer",
        "AWS Developer Associate",
        "Develop, deploy and debug cloud-based applications on AWS.",
    ),
];

/// Creates the default exams, or refreshes their name, description and settings when they
/// already exist. Running it twice changes nothing the second time.
///
/// # Errors
///
/// Returns `AppServicesError` when a slug is invalid or storage fails.
pub async fn ensure_default_exams(
    exams: &dyn ExamRepository,
    clock: Clock,
    settings: ExamSettings,
) -> Result<Vec<Exam>, AppServicesError> {
    let mut out = Vec::with_capacity(DEFAULT_EXAMS.len());
    for (slug, name, description) in DEFAULT_EXAMS {
        let exam_type = ExamType::parse(slug)?;
        let exam = match exams.exam_by_type(&exam_type).await? {
            Some(existing) => {
                let updated = Exam::new(
                    existing.id(),
                    name,
                    exam_type,
                    description,
                    settings,
                    existing.created_at(),
                )?
                .with_active(existing.is_active());
                if updated != existing {
                    exams.upsert_exam(&updated).await?;
                    info!(exam_type = slug, "default exam updated");
                }
                updated
            }
            None => {
                let created = exams
                    .insert_new_exam(NewExamRecord {
                        name: name.to_owned(),
                        exam_type,
                        description: description.to_owned(),
                        settings,
                        is_active: true,
                        created_at: clock.now(),
                    })
                    .await?;
                info!(exam_type = slug, exam_id = %created.id(), "default exam created");
                created
            }
        };
        out.push(exam);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use certprep_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let repo = InMemoryRepository::new();
        let first = ensure_default_exams(&repo, fixed_clock(), ExamSettings::default())
            .await
            .unwrap();
        let second = ensure_default_exams(&repo, fixed_clock(), ExamSettings::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.list_exams(true).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reseeding_applies_new_settings() {
        let repo = InMemoryRepository::new();
        ensure_default_exams(&repo, fixed_clock(), ExamSettings::default())
            .await
            .unwrap();
        let stricter = ExamSettings::new(50, 100, 60, 80).unwrap();
        ensure_default_exams(&repo, fixed_clock(), stricter)
            .await
            .unwrap();

        let exam = repo
            .exam_by_type(&ExamType::parse("developer").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exam.settings().passing_score(), 80);
        assert_eq!(exam.settings().seconds_per_question(), 60);
    }
}
