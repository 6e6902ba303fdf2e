use std::sync::Arc;

use lesson_core::model::{AnswerValue, LessonId, UserId};
use storage::repository::LessonRepository;

use super::service::AttemptSession;
use crate::Clock;
use crate::error::{ProgressError, SessionError};
use crate::progress::{MergeReport, ProgressAggregator};

/// Orchestrates attempts from lesson lookup to progress merge.
///
/// The session keeps its finished result until a merge succeeds, so a failed submit
/// can be retried with [`LessonAttemptService::submit_pending`] without replaying the
/// attempt. Retries reuse the attempt id and cannot double count.
#[derive(Clone)]
pub struct LessonAttemptService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    aggregator: Arc<ProgressAggregator>,
}

impl LessonAttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        aggregator: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            clock,
            lessons,
            aggregator,
        }
    }

    /// Load the lesson and start an attempt at it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the lesson is missing or storage fails.
    pub async fn start(&self, lesson_id: &LessonId) -> Result<AttemptSession, SessionError> {
        let lesson = self.lessons.get_lesson(lesson_id).await?;
        let mut session = AttemptSession::new(lesson);
        session.start(self.clock.now())?;
        Ok(session)
    }

    /// Answer the exercise on screen, stamped with the service clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session rejects the answer.
    pub fn answer_current(
        &self,
        session: &mut AttemptSession,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        session.answer_current(value, self.clock.now())
    }

    /// Finish the attempt (if still running) and merge it into progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError`; on merge failure the result stays pending on the session.
    pub async fn finish_and_submit(
        &self,
        user_id: &UserId,
        session: &mut AttemptSession,
    ) -> Result<MergeReport, ProgressError> {
        if !session.is_complete() {
            session.finish(self.clock.now())?;
        }
        self.submit_pending(user_id, session).await
    }

    /// Merge a finished attempt that has not reached the store yet.
    ///
    /// Calling it again after success is harmless and reports `already_applied`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` (as `ProgressError::Session`) if the session
    /// has not been finished, or the merge error.
    pub async fn submit_pending(
        &self,
        user_id: &UserId,
        session: &mut AttemptSession,
    ) -> Result<MergeReport, ProgressError> {
        let result = session
            .result()
            .cloned()
            .ok_or(SessionError::NotCompleted)?;

        match self.aggregator.merge(user_id, &result).await {
            Ok(report) => {
                session.mark_submitted();
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    attempt_id = %result.attempt_id(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "attempt kept pending after failed submit"
                );
                Err(err)
            }
        }
    }
}
