use std::collections::HashMap;

use certprep_core::model::{ExamId, Question, QuestionId, ValidatedQuestion};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    QUESTION_COLUMNS, db_err, id_to_i64, map_question_row, option_columns, question_id_from_i64,
    ser,
};
use crate::repository::{QuestionFilter, QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn count_questions(&self, exam_id: ExamId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = ?1")
            .bind(id_to_i64("exam_id", exam_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn question_ids(&self, exam_id: ExamId) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query("SELECT id FROM questions WHERE exam_id = ?1 ORDER BY id ASC")
            .bind(id_to_i64("exam_id", exam_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| question_id_from_i64(row.try_get("id").map_err(ser)?))
            .collect()
    }

    async fn get_questions(
        &self,
        exam_id: ExamId,
        ids: &[QuestionId],
    ) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = ?1 AND id IN (");
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 2).to_string());
        }
        sql.push(')');

        let mut q = sqlx::query(&sql).bind(id_to_i64("exam_id", exam_id.value())?);
        for id in ids {
            q = q.bind(id_to_i64("question_id", id.value())?);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut by_id: HashMap<QuestionId, Question> = HashMap::with_capacity(rows.len());
        for row in rows {
            let question = map_question_row(&row)?;
            by_id.insert(question.id(), question);
        }

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.get(id) {
                Some(question) => out.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn insert_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError> {
        let [a, b, c, d] = option_columns(&question.options);
        let res = sqlx::query(
            r"
            INSERT INTO questions (
                exam_id, question_text, domain, difficulty, explanation,
                option_a, option_b, option_c, option_d, correct_answer, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(id_to_i64("exam_id", question.exam_id.value())?)
        .bind(question.text.clone())
        .bind(question.domain.clone())
        .bind(question.difficulty.as_str())
        .bind(question.explanation.clone())
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(String::from(question.correct))
        .bind(question.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = question_id_from_i64(res.last_insert_rowid())?;
        Ok(question.assign_id(id))
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let mut clauses = Vec::new();
        if filter.exam_id.is_some() {
            clauses.push("exam_id = ?");
        }
        if filter.domain.is_some() {
            clauses.push("domain = ?");
        }
        if filter.difficulty.is_some() {
            clauses.push("difficulty = ?");
        }
        let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(exam_id) = filter.exam_id {
            q = q.bind(id_to_i64("exam_id", exam_id.value())?);
        }
        if let Some(domain) = &filter.domain {
            q = q.bind(domain.clone());
        }
        if let Some(difficulty) = filter.difficulty {
            q = q.bind(difficulty.as_str());
        }
        let rows = q
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_question_row).collect()
    }
}
