use std::sync::Arc;

use lesson_core::merge::{MergePolicy, merge};
use lesson_core::model::{Achievement, AttemptResult, ProgressDocument, UserId};
use storage::repository::{LessonRepository, ProgressRepository, StorageError};

use super::request::{SubmitProgressRequest, SubmitProgressResponse};
use super::summary::ProgressSummary;
use crate::Clock;
use crate::error::ProgressError;

/// Conflict retries after the first save attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What one merge did to the stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub document: ProgressDocument,
    /// Revision of `document` in the store.
    pub revision: u64,
    pub score: u8,
    pub already_applied: bool,
    pub newly_completed: bool,
    pub new_achievements: Vec<Achievement>,
}

/// Folds finished attempts into stored progress documents.
///
/// Each merge is load, pure merge, compare-and-swap save. A lost race reloads and
/// merges again on top of the winner's document.
#[derive(Clone)]
pub struct ProgressAggregator {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    lessons: Option<Arc<dyn LessonRepository>>,
    policy: MergePolicy,
    max_retries: u32,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            progress,
            lessons: None,
            policy: MergePolicy::default(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Require submitted lesson ids to exist in `lessons`.
    #[must_use]
    pub fn with_lesson_catalog(mut self, lessons: Arc<dyn LessonRepository>) -> Self {
        self.lessons = Some(lessons);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Merge a finished attempt into `user_id`'s document.
    ///
    /// Re-merging an attempt the document already holds returns the stored state with
    /// `already_applied` set and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Validation` for invalid attempts,
    /// `ProgressError::ConflictRetriesExhausted` if every save lost a race, and
    /// `ProgressError::Storage` for any other storage failure. Nothing is written on error.
    pub async fn merge(
        &self,
        user_id: &UserId,
        attempt: &AttemptResult,
    ) -> Result<MergeReport, ProgressError> {
        let attempts = self.max_retries.saturating_add(1);

        for round in 1..=attempts {
            let stored = self.progress.load_progress(user_id).await?;
            let (previous, revision) = match stored {
                Some(v) => (Some(v.document), Some(v.revision)),
                None => (None, None),
            };

            let now = self.clock.now();
            let outcome = merge(previous, user_id, attempt, now, &self.policy)?;

            if outcome.already_applied {
                tracing::debug!(
                    user_id = %user_id,
                    attempt_id = %attempt.attempt_id(),
                    "attempt already merged; skipping"
                );
                return Ok(MergeReport {
                    document: outcome.document,
                    revision: revision.unwrap_or_default(),
                    score: attempt.score(),
                    already_applied: true,
                    newly_completed: false,
                    new_achievements: Vec::new(),
                });
            }

            match self.progress.save_progress(&outcome.document, revision).await {
                Ok(new_revision) => {
                    tracing::info!(
                        user_id = %user_id,
                        lesson_id = %attempt.lesson_id(),
                        attempt_id = %attempt.attempt_id(),
                        score = attempt.score(),
                        revision = new_revision,
                        newly_completed = outcome.newly_completed,
                        "attempt merged into progress"
                    );
                    return Ok(MergeReport {
                        document: outcome.document,
                        revision: new_revision,
                        score: attempt.score(),
                        already_applied: false,
                        newly_completed: outcome.newly_completed,
                        new_achievements: outcome.new_achievements,
                    });
                }
                Err(StorageError::Conflict) => {
                    tracing::debug!(
                        user_id = %user_id,
                        round,
                        "progress revision moved underneath us; retrying merge"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        user_id = %user_id,
                        attempt_id = %attempt.attempt_id(),
                        error = %err,
                        "failed to save progress"
                    );
                    return Err(err.into());
                }
            }
        }

        tracing::warn!(user_id = %user_id, attempts, "giving up on progress merge after conflicts");
        Err(ProgressError::ConflictRetriesExhausted { attempts })
    }

    /// Handle a client-reported lesson completion.
    ///
    /// With a lesson catalog configured the lesson must exist, and its skill keys the
    /// skill score. The request's skill is only used for lessons that carry none.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` from validation, the lesson catalog lookup or the merge.
    pub async fn submit(
        &self,
        user_id: &UserId,
        request: SubmitProgressRequest,
    ) -> Result<SubmitProgressResponse, ProgressError> {
        let mut attempt = request.into_attempt(self.clock.now())?;
        if let Some(lessons) = &self.lessons {
            let lesson = lessons.get_lesson(attempt.lesson_id()).await?;
            if let Some(skill) = lesson.skill
                && attempt.skill() != Some(skill)
            {
                tracing::debug!(
                    lesson_id = %lesson.id,
                    reported = ?attempt.skill(),
                    skill = %skill,
                    "using the catalog skill for this lesson"
                );
                attempt = attempt.with_skill(Some(skill));
            }
        }

        let report = self.merge(user_id, &attempt).await?;
        Ok(SubmitProgressResponse {
            score: report.score,
            updated_progress: ProgressSummary::from_document(
                &report.document,
                self.clock.today(),
            ),
            new_achievements: report.new_achievements,
            already_applied: report.already_applied,
        })
    }

    /// The stored document, if the learner has any activity.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the store fails.
    pub async fn document(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ProgressDocument>, ProgressError> {
        Ok(self
            .progress
            .load_progress(user_id)
            .await?
            .map(|v| v.document))
    }

    /// Current summary; learners without activity get an empty one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the store fails.
    pub async fn load(&self, user_id: &UserId) -> Result<ProgressSummary, ProgressError> {
        let now = self.clock.now();
        let doc = self.document(user_id).await?.unwrap_or_else(|| {
            ProgressDocument::new(user_id.clone(), self.policy.default_weekly_goal, now)
        });
        Ok(ProgressSummary::from_document(&doc, now.date_naive()))
    }
}
