use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lesson_core::merge::MergeError;
use lesson_core::model::{
    Achievement, AttemptId, AttemptResult, AttemptTotals, LessonId, QuestionOutcome, Skill,
};

use super::summary::ProgressSummary;
use crate::error::ProgressError;

/// Answer counters a client reports alongside its score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedStats {
    pub total_questions_answered: u32,
    pub total_correct_answers: u32,
    pub total_incorrect_answers: u32,
    #[serde(default)]
    pub question_answers: Vec<QuestionOutcome>,
}

/// Wire shape of "a learner finished a lesson".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProgressRequest {
    pub lesson_id: String,
    /// Kept wide so out-of-range values reach validation instead of failing to parse.
    pub score: i64,
    /// Minutes.
    #[serde(default)]
    pub time_spent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<Skill>,
    /// Supplying an id makes resubmission idempotent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<AttemptId>,
    #[serde(default)]
    pub stats: SubmittedStats,
}

impl SubmitProgressRequest {
    /// Validate and convert into the attempt the merge consumes.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Validation` for a blank lesson id or a score outside
    /// 0..=100, and `ProgressError::InvalidStats` when the counters contradict each other.
    pub fn into_attempt(self, completed_at: DateTime<Utc>) -> Result<AttemptResult, ProgressError> {
        let lesson_id = self.lesson_id.trim();
        if lesson_id.is_empty() {
            return Err(MergeError::EmptyLessonId.into());
        }
        let score = u8::try_from(self.score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or(MergeError::ScoreOutOfRange(self.score))?;
        let totals = AttemptTotals::new(
            self.stats.total_questions_answered,
            self.stats.total_correct_answers,
            self.stats.total_incorrect_answers,
        )?;

        Ok(AttemptResult::from_reported(
            self.attempt_id.unwrap_or_else(AttemptId::generate),
            LessonId::new(lesson_id),
            self.skill,
            score,
            self.time_spent,
            self.stats.question_answers,
            totals,
            completed_at,
        ))
    }
}

/// Reply to a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProgressResponse {
    pub score: u8,
    pub updated_progress: ProgressSummary,
    pub new_achievements: Vec<Achievement>,
    pub already_applied: bool,
}
