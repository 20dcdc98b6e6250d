use certprep_core::model::{Exam, ExamId, ExamType};

use super::SqliteRepository;
use super::mapping::{EXAM_COLUMNS, db_err, exam_id_from_i64, id_to_i64, map_exam_row};
use crate::repository::{ExamRepository, NewExamRecord, StorageError};

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<Exam, StorageError> {
        // Same checks as the domain constructor, before anything is written.
        exam.clone().into_exam(ExamId::new(0))?;

        let res = sqlx::query(
            r"
            INSERT INTO exams (
                name, exam_type, description, session_size, target_pool_size,
                seconds_per_question, passing_score, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(exam.name.trim().to_owned())
        .bind(exam.exam_type.as_str().to_owned())
        .bind(exam.description.clone())
        .bind(i64::from(exam.settings.session_size()))
        .bind(i64::from(exam.settings.target_pool_size()))
        .bind(i64::from(exam.settings.seconds_per_question()))
        .bind(i64::from(exam.settings.passing_score()))
        .bind(i64::from(exam.is_active))
        .bind(exam.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = exam_id_from_i64(res.last_insert_rowid())?;
        self.get_exam(id).await?.ok_or(StorageError::NotFound)
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let settings = exam.settings();
        sqlx::query(
            r"
            INSERT INTO exams (
                id, name, exam_type, description, session_size, target_pool_size,
                seconds_per_question, passing_score, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                exam_type = excluded.exam_type,
                description = excluded.description,
                session_size = excluded.session_size,
                target_pool_size = excluded.target_pool_size,
                seconds_per_question = excluded.seconds_per_question,
                passing_score = excluded.passing_score,
                is_active = excluded.is_active
            ",
        )
        .bind(id_to_i64("exam_id", exam.id().value())?)
        .bind(exam.name().to_owned())
        .bind(exam.exam_type().as_str().to_owned())
        .bind(exam.description().to_owned())
        .bind(i64::from(settings.session_size()))
        .bind(i64::from(settings.target_pool_size()))
        .bind(i64::from(settings.seconds_per_question()))
        .bind(i64::from(settings.passing_score()))
        .bind(i64::from(exam.is_active()))
        .bind(exam.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("exam_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_exam_row).transpose()
    }

    async fn exam_by_type(&self, exam_type: &ExamType) -> Result<Option<Exam>, StorageError> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE exam_type = ?1");
        let row = sqlx::query(&sql)
            .bind(exam_type.as_str().to_owned())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_exam_row).transpose()
    }

    async fn list_exams(&self, active_only: bool) -> Result<Vec<Exam>, StorageError> {
        let sql = if active_only {
            format!("SELECT {EXAM_COLUMNS} FROM exams WHERE is_active = 1 ORDER BY id ASC")
        } else {
            format!("SELECT {EXAM_COLUMNS} FROM exams ORDER BY id ASC")
        };
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut exams = Vec::with_capacity(rows.len());
        for row in rows {
            exams.push(map_exam_row(&row)?);
        }
        Ok(exams)
    }
}
