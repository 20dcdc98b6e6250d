use std::sync::Arc;

use certprep_core::model::{Exam, ExamSettings};
use storage::repository::Storage;

use crate::Clock;
use crate::catalog::ensure_default_exams;
use crate::config::PoolSettings;
use crate::error::AppServicesError;
use crate::generation::QuestionGenerator;
use crate::import_service::ImportService;
use crate::pool::PoolService;
use crate::random::RandomSource;
use crate::review_service::ExamReviewService;
use crate::sessions::LocalBackend;

/// Runtime settings shared by the assembled services.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServiceSettings {
    pub pool: PoolSettings,
    /// Applied to the default exams when they are created or refreshed.
    pub exam: ExamSettings,
}

/// Assembles app-facing services over one storage backend and makes sure the default exams
/// exist.
#[derive(Clone)]
pub struct AppServices {
    exams: Vec<Exam>,
    pool: PoolService,
    reviews: ExamReviewService,
    import: ImportService,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or default exam setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ServiceSettings,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let rng = Arc::new(RandomSource::from_os_rng());
        Self::from_storage(storage, clock, settings, generator, rng).await
    }

    /// Build services over an arbitrary storage and random source.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if default exam setup fails.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        settings: ServiceSettings,
        generator: Arc<dyn QuestionGenerator>,
        rng: Arc<RandomSource>,
    ) -> Result<Self, AppServicesError> {
        let exams = ensure_default_exams(storage.exams.as_ref(), clock, settings.exam).await?;

        let pool = PoolService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.questions),
            generator,
            rng,
            settings.pool,
        );
        let reviews = ExamReviewService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.reviews),
        );
        let import = ImportService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.questions),
        );

        Ok(Self {
            exams,
            pool,
            reviews,
            import,
        })
    }

    /// The default exams as they stood after startup.
    #[must_use]
    pub fn default_exams(&self) -> &[Exam] {
        &self.exams
    }

    #[must_use]
    pub fn pool(&self) -> PoolService {
        self.pool.clone()
    }

    #[must_use]
    pub fn reviews(&self) -> ExamReviewService {
        self.reviews.clone()
    }

    #[must_use]
    pub fn import(&self) -> ImportService {
        self.import.clone()
    }

    /// In-process backend for a session controller.
    #[must_use]
    pub fn local_backend(&self) -> LocalBackend {
        LocalBackend::new(self.pool(), self.reviews())
    }
}
