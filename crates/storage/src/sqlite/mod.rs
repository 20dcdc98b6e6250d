use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ExamRepository, QuestionRepository, ReviewRepository, Storage};

mod exam_repo;
mod mapping;
mod migrate;
mod question_repo;
mod review_repo;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Exams, the question pool and reviews in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("invalid database url {url}: {source}")]
    InvalidUrl { url: String, source: sqlx::Error },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Opens (creating if missing) the database at `database_url` and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::InvalidUrl` for an unparseable url, otherwise `Sqlx` when the
    /// connection or a migration fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|source| SqliteInitError::InvalidUrl {
                url: database_url.to_owned(),
                source,
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(options)
            .await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

impl Storage {
    /// `SQLite`-backed storage; every repository handle shares one connection pool.
    ///
    /// # Errors
    ///
    /// See [`SqliteRepository::open`].
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        Ok(Self {
            exams: Arc::new(repo.clone()) as Arc<dyn ExamRepository>,
            questions: Arc::new(repo.clone()) as Arc<dyn QuestionRepository>,
            reviews: Arc::new(repo) as Arc<dyn ReviewRepository>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_url_parameters_are_rejected_before_connecting() {
        let result = SqliteRepository::open("sqlite:file:certprep?mode=sideways").await;
        assert!(matches!(result, Err(SqliteInitError::InvalidUrl { .. })));
    }
}
