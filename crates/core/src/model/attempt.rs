use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AttemptId, ExerciseId, LessonId};
use crate::model::skill::Skill;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("too many exercises for a single attempt: {len}")]
    TooManyOutcomes { len: usize },

    #[error("correct ({correct}) + incorrect ({incorrect}) exceeds answered ({answered})")]
    CountMismatch {
        answered: u32,
        correct: u32,
        incorrect: u32,
    },
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Correct,
    Incorrect,
    /// Collected but not auto-scored (essays).
    Ungraded,
}

/// Per-exercise line of an attempt's breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub exercise_id: ExerciseId,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub points_earned: u32,
}

impl QuestionOutcome {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.status == OutcomeStatus::Correct
    }

    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.status != OutcomeStatus::Ungraded
    }
}

/// Cumulative counters of one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptTotals {
    pub total_questions_answered: u32,
    pub total_correct: u32,
    pub total_incorrect: u32,
}

impl AttemptTotals {
    /// # Errors
    ///
    /// Returns `AttemptError::CountMismatch` when correct + incorrect exceed answered.
    pub fn new(answered: u32, correct: u32, incorrect: u32) -> Result<Self, AttemptError> {
        if correct.saturating_add(incorrect) > answered {
            return Err(AttemptError::CountMismatch {
                answered,
                correct,
                incorrect,
            });
        }
        Ok(Self {
            total_questions_answered: answered,
            total_correct: correct,
            total_incorrect: incorrect,
        })
    }
}

/// Percentage of correct answers over graded exercises, rounded half up.
///
/// Returns 0 when nothing was graded.
#[must_use]
pub fn score_percent(correct: u32, graded: u32) -> u8 {
    if graded == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(graded));
    let graded = u64::from(graded);
    let rounded = (200 * correct + graded) / (2 * graded);
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── ATTEMPT RESULT ────────────────────────────────────────────────────────────
//

/// Immutable output of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    attempt_id: AttemptId,
    lesson_id: LessonId,
    skill: Option<Skill>,
    score: u8,
    time_spent_seconds: u64,
    outcomes: Vec<QuestionOutcome>,
    totals: AttemptTotals,
    completed_at: DateTime<Utc>,
}

impl AttemptResult {
    /// Build a result from evaluated outcomes, deriving score and totals.
    ///
    /// Ungraded outcomes are excluded from the score denominator. Skipped exercises
    /// lower the score but are not counted as answered or incorrect, so the totals
    /// pass the same check a client-reported result does.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::TooManyOutcomes` if counts cannot fit in `u32`.
    pub fn from_outcomes(
        attempt_id: AttemptId,
        lesson_id: LessonId,
        skill: Option<Skill>,
        outcomes: Vec<QuestionOutcome>,
        time_spent_seconds: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let len = outcomes.len();
        let count = |n: usize| u32::try_from(n).map_err(|_| AttemptError::TooManyOutcomes { len });
        let answered = outcomes.iter().filter(|o| o.user_answer.is_some());
        let graded = count(outcomes.iter().filter(|o| o.is_graded()).count())?;
        let correct = count(answered.clone().filter(|o| o.is_correct()).count())?;
        let incorrect = count(
            answered
                .clone()
                .filter(|o| o.status == OutcomeStatus::Incorrect)
                .count(),
        )?;
        let answered = count(answered.count())?;

        let totals = AttemptTotals::new(answered, correct, incorrect)?;

        Ok(Self {
            attempt_id,
            lesson_id,
            skill,
            score: score_percent(correct, graded),
            time_spent_seconds,
            outcomes,
            totals,
            completed_at,
        })
    }

    /// Rehydrate a result whose score was computed elsewhere (e.g. reported by a client).
    ///
    /// No range checks happen here; the merge step validates.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_reported(
        attempt_id: AttemptId,
        lesson_id: LessonId,
        skill: Option<Skill>,
        score: u8,
        time_spent_minutes: u32,
        outcomes: Vec<QuestionOutcome>,
        totals: AttemptTotals,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            attempt_id,
            lesson_id,
            skill,
            score,
            time_spent_seconds: u64::from(time_spent_minutes) * 60,
            outcomes,
            totals,
            completed_at,
        }
    }

    /// Re-key the skill score this attempt feeds.
    #[must_use]
    pub fn with_skill(mut self, skill: Option<Skill>) -> Self {
        self.skill = skill;
        self
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn skill(&self) -> Option<Skill> {
        self.skill
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> u64 {
        self.time_spent_seconds
    }

    /// Whole minutes spent, rounded down.
    #[must_use]
    pub fn time_spent_minutes(&self) -> u32 {
        u32::try_from(self.time_spent_seconds / 60).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn totals(&self) -> AttemptTotals {
        self.totals
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
