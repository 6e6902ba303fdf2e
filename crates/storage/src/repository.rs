use async_trait::async_trait;
use lesson_core::model::{Lesson, LessonId, ProgressDocument, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The stored revision is not the one the caller read.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A progress document together with the revision it was read at.
///
/// Revisions start at 1 and increase by one on every successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedProgress {
    pub document: ProgressDocument,
    pub revision: u64,
}

/// Durable, keyed storage of one progress document per learner.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the learner's document, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the stored document is unreadable.
    async fn load_progress(&self, user_id: &UserId)
    -> Result<Option<VersionedProgress>, StorageError>;

    /// Store `document` if the current revision equals `expected_revision`.
    ///
    /// `None` means the caller saw no document and expects to create it.
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when another writer got there first.
    async fn save_progress(
        &self,
        document: &ProgressDocument,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError>;
}

/// Read side of authored lessons, plus an import hook for tooling.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or replace a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError>;

    /// List lessons ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_lessons(&self, limit: u32) -> Result<Vec<Lesson>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<UserId, VersionedProgress>>>,
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user_id).cloned())
    }

    async fn save_progress(
        &self,
        document: &ProgressDocument,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let current = guard.get(&document.user_id).map(|v| v.revision);
        if current != expected_revision {
            return Err(StorageError::Conflict);
        }
        let revision = current.map_or(1, |r| r + 1);
        guard.insert(
            document.user_id.clone(),
            VersionedProgress {
                document: document.clone(),
                revision,
            },
        );
        Ok(revision)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_lessons(&self, limit: u32) -> Result<Vec<Lesson>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut lessons: Vec<Lesson> = guard.values().cloned().collect();
        lessons.sort_by(|a, b| a.id.cmp(&b.id));
        lessons.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(lessons)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub lessons: Arc<dyn LessonRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo);
        Self { progress, lessons }
    }
}
