use certprep_core::model::{
    AnswerOption, Difficulty, Exam, ExamId, ExamSettings, ExamType, OptionLetter, Question,
    QuestionDraft, QuestionId, Review, ReviewId, ValidatedReview,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Unique-index violations become `Conflict`; everything else is a connection problem.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn review_id_from_i64(v: i64) -> Result<ReviewId, StorageError> {
    Ok(ReviewId::new(i64_to_u64("review_id", v)?))
}

pub(crate) const EXAM_COLUMNS: &str = "id, name, exam_type, description, session_size, \
     target_pool_size, seconds_per_question, passing_score, is_active, created_at";

pub(crate) fn map_exam_row(row: &SqliteRow) -> Result<Exam, StorageError> {
    let settings = ExamSettings::new(
        i64_to_u32("session_size", row.try_get("session_size").map_err(ser)?)?,
        i64_to_u32("target_pool_size", row.try_get("target_pool_size").map_err(ser)?)?,
        i64_to_u32(
            "seconds_per_question",
            row.try_get("seconds_per_question").map_err(ser)?,
        )?,
        i64_to_u8("passing_score", row.try_get("passing_score").map_err(ser)?)?,
    )
    .map_err(ser)?;

    let exam_type = ExamType::parse(row.try_get::<String, _>("exam_type").map_err(ser)?)
        .map_err(ser)?;

    Exam::new(
        exam_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        exam_type,
        row.try_get::<String, _>("description").map_err(ser)?,
        settings,
        row.try_get("created_at").map_err(ser)?,
    )
    .map(|exam| exam.with_active(row.try_get::<i64, _>("is_active").unwrap_or(1) != 0))
    .map_err(ser)
}

pub(crate) const QUESTION_COLUMNS: &str = "id, exam_id, question_text, domain, difficulty, \
     explanation, option_a, option_b, option_c, option_d, correct_answer, created_at";

/// Option text per letter, `None` for letters the question does not use.
pub(crate) fn option_columns(options: &[AnswerOption]) -> [Option<String>; 4] {
    let mut columns: [Option<String>; 4] = Default::default();
    for option in options {
        let slot = OptionLetter::ALL
            .iter()
            .position(|l| *l == option.letter)
            .unwrap_or(0);
        columns[slot] = Some(option.text.clone());
    }
    columns
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let mut options = Vec::with_capacity(4);
    for (letter, column) in OptionLetter::ALL
        .into_iter()
        .zip(["option_a", "option_b", "option_c", "option_d"])
    {
        if let Some(text) = row.try_get::<Option<String>, _>(column).map_err(ser)? {
            options.push(AnswerOption::new(letter, text));
        }
    }

    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let correct: OptionLetter = row
        .try_get::<String, _>("correct_answer")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let validated = QuestionDraft {
        exam_id: exam_id_from_i64(row.try_get("exam_id").map_err(ser)?)?,
        text: row.try_get("question_text").map_err(ser)?,
        domain: row.try_get("domain").map_err(ser)?,
        difficulty,
        explanation: row.try_get("explanation").map_err(ser)?,
        options,
        correct,
    }
    .validate(row.try_get("created_at").map_err(ser)?)
    .map_err(ser)?;

    Ok(validated.assign_id(question_id_from_i64(row.try_get("id").map_err(ser)?)?))
}

pub(crate) const REVIEW_COLUMNS: &str =
    "id, exam_id, user_uid, user_name, rating, comment, exam_score, passed, created_at";

pub(crate) fn map_review_row(row: &SqliteRow) -> Result<Review, StorageError> {
    let exam_score = row
        .try_get::<Option<i64>, _>("exam_score")
        .map_err(ser)?
        .map(|v| i64_to_u8("exam_score", v))
        .transpose()?;

    let review = ValidatedReview {
        exam_id: exam_id_from_i64(row.try_get("exam_id").map_err(ser)?)?,
        user_uid: row.try_get("user_uid").map_err(ser)?,
        user_name: row.try_get("user_name").map_err(ser)?,
        rating: i64_to_u8("rating", row.try_get("rating").map_err(ser)?)?,
        comment: row.try_get("comment").map_err(ser)?,
        exam_score,
        passed: row
            .try_get::<Option<i64>, _>("passed")
            .map_err(ser)?
            .map(|v| v != 0),
        created_at: row.try_get("created_at").map_err(ser)?,
    };
    Ok(review.assign_id(review_id_from_i64(row.try_get("id").map_err(ser)?)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_columns_follow_letters() {
        let columns = option_columns(&[
            AnswerOption::new(OptionLetter::C, "EFS"),
            AnswerOption::new(OptionLetter::A, "S3"),
        ]);
        assert_eq!(
            columns,
            [Some("S3".to_owned()), None, Some("EFS".to_owned()), None]
        );
    }
}
