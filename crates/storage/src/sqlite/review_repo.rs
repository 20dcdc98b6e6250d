use certprep_core::model::{ExamId, Review, ValidatedReview};

use super::SqliteRepository;
use super::mapping::{REVIEW_COLUMNS, db_err, id_to_i64, map_review_row, review_id_from_i64};
use crate::repository::{ReviewRepository, StorageError};

#[async_trait::async_trait]
impl ReviewRepository for SqliteRepository {
    async fn append_review(&self, review: ValidatedReview) -> Result<Review, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO reviews (
                exam_id, user_uid, user_name, rating, comment, exam_score, passed, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("exam_id", review.exam_id.value())?)
        .bind(review.user_uid.clone())
        .bind(review.user_name.clone())
        .bind(i64::from(review.rating))
        .bind(review.comment.clone())
        .bind(review.exam_score.map(i64::from))
        .bind(review.passed.map(i64::from))
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(review.assign_id(review_id_from_i64(res.last_insert_rowid())?))
    }

    async fn list_reviews(&self, exam_id: ExamId, limit: u32) -> Result<Vec<Review>, StorageError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE exam_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("exam_id", exam_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut reviews = Vec::with_capacity(rows.len());
        for row in rows {
            reviews.push(map_review_row(&row)?);
        }
        Ok(reviews)
    }
}
