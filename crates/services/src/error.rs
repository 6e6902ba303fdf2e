//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::merge::MergeError;
use lesson_core::model::{AttemptError, ExerciseId, LessonError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the attempt session and its workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is not in progress")]
    NotInProgress,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session already completed")]
    Completed,
    #[error("session is not completed yet")]
    NotCompleted,
    #[error("already at the first exercise")]
    AtFirstExercise,
    #[error("already at the last exercise; call finish to complete the attempt")]
    AtLastExercise,
    #[error("exercise index {index} is out of range for {len} exercises")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("exercise {0} is not part of this lesson")]
    UnknownExercise(ExerciseId),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while merging attempts into progress.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Validation(#[from] MergeError),
    #[error("invalid attempt statistics: {0}")]
    InvalidStats(#[from] AttemptError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("progress update lost {attempts} races in a row; retry later")]
    ConflictRetriesExhausted { attempts: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    /// HTTP-equivalent status for callers exposing the engine over a network boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ProgressError::Validation(_)
            | ProgressError::InvalidStats(_)
            | ProgressError::Session(_) => 400,
            ProgressError::Storage(StorageError::NotFound) => 404,
            ProgressError::ConflictRetriesExhausted { .. } => 409,
            ProgressError::Storage(_) => 500,
        }
    }

    /// Whether resubmitting the same attempt later can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProgressError::ConflictRetriesExhausted { .. }
                | ProgressError::Storage(StorageError::Connection(_) | StorageError::Conflict)
        )
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            ProgressError::Validation(MergeError::EmptyLessonId).status_code(),
            400
        );
        assert_eq!(
            ProgressError::Validation(MergeError::ScoreOutOfRange(140)).status_code(),
            400
        );
        assert_eq!(
            ProgressError::Storage(StorageError::Connection("down".into())).status_code(),
            500
        );
        assert_eq!(
            ProgressError::ConflictRetriesExhausted { attempts: 4 }.status_code(),
            409
        );
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ProgressError::Storage(StorageError::Connection("x".into())).is_retryable());
        assert!(!ProgressError::Validation(MergeError::EmptyLessonId).is_retryable());
    }
}
