use std::sync::Arc;

use lesson_core::merge::MergePolicy;
use lesson_core::model::{Lesson, LessonId};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress::{DEFAULT_MAX_RETRIES, ProgressAggregator};
use crate::sessions::LessonAttemptService;

/// Knobs the binary passes down from its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub policy: MergePolicy,
    pub max_merge_retries: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            policy: MergePolicy::default(),
            max_merge_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    progress: Arc<ProgressAggregator>,
    attempts: Arc<LessonAttemptService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, settings))
    }

    /// Build services over in-memory repositories.
    #[must_use]
    pub fn in_memory(clock: Clock, settings: ServiceSettings) -> Self {
        Self::from_storage(Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, settings: ServiceSettings) -> Self {
        let progress = Arc::new(
            ProgressAggregator::new(clock, Arc::clone(&storage.progress))
                .with_policy(settings.policy)
                .with_max_retries(settings.max_merge_retries)
                .with_lesson_catalog(Arc::clone(&storage.lessons)),
        );
        let attempts = Arc::new(LessonAttemptService::new(
            clock,
            Arc::clone(&storage.lessons),
            Arc::clone(&progress),
        ));

        Self {
            storage,
            progress,
            attempts,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressAggregator> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<LessonAttemptService> {
        Arc::clone(&self.attempts)
    }

    /// Store an authored lesson after re-validating it.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the lesson is malformed or cannot be stored.
    pub async fn import_lesson(&self, lesson: &Lesson) -> Result<(), AppServicesError> {
        lesson.validate()?;
        self.storage.lessons.upsert_lesson(lesson).await?;
        tracing::info!(
            lesson_id = %lesson.id,
            exercises = lesson.len(),
            "lesson imported"
        );
        Ok(())
    }

    /// Lessons ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` on backend failures.
    pub async fn lessons(&self, limit: u32) -> Result<Vec<Lesson>, AppServicesError> {
        Ok(self.storage.lessons.list_lessons(limit).await?)
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the lesson is missing or storage fails.
    pub async fn lesson(&self, id: &LessonId) -> Result<Lesson, AppServicesError> {
        Ok(self.storage.lessons.get_lesson(id).await?)
    }
}
