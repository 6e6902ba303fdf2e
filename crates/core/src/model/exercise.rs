use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ExerciseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("exercise id cannot be empty")]
    EmptyId,

    #[error("exercise {0} must be worth at least one point")]
    ZeroPoints(ExerciseId),

    #[error("exercise {0} has no accepted answer")]
    MissingAnswerKey(ExerciseId),

    #[error("exercise {id} declares blank position {position} more than once")]
    DuplicateBlank { id: ExerciseId, position: u32 },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

//
// ─── ANSWER KEYS ───────────────────────────────────────────────────────────────
//

/// One gap of a fill-in-blank exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    pub position: u32,
    pub answer: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl Blank {
    #[must_use]
    pub fn new(position: u32, answer: impl Into<String>) -> Self {
        Self {
            position,
            answer: answer.into(),
            alternatives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Primary answer followed by every alternative.
    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.answer.as_str()).chain(self.alternatives.iter().map(String::as_str))
    }
}

/// Exercise type together with its answer key.
///
/// Content data may carry a `type` this build does not know; it deserializes to
/// `Unknown` and is scored as incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExerciseKind {
    SingleChoice {
        #[serde(default)]
        options: Vec<String>,
        correct: String,
    },
    MultipleChoice {
        #[serde(default)]
        options: Vec<String>,
        correct: Vec<String>,
    },
    FillInBlank {
        blanks: Vec<Blank>,
    },
    TrueFalse {
        correct: bool,
    },
    Translation {
        accepted: Vec<String>,
    },
    Essay,
    #[serde(other)]
    Unknown,
}

impl ExerciseKind {
    /// Stable name used in logs and content files.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ExerciseKind::SingleChoice { .. } => "single-choice",
            ExerciseKind::MultipleChoice { .. } => "multiple-choice",
            ExerciseKind::FillInBlank { .. } => "fill-in-blank",
            ExerciseKind::TrueFalse { .. } => "true-false",
            ExerciseKind::Translation { .. } => "translation",
            ExerciseKind::Essay => "essay",
            ExerciseKind::Unknown => "unknown",
        }
    }

    /// Whether answers of this kind count towards the attempt score.
    #[must_use]
    pub fn is_auto_graded(&self) -> bool {
        !matches!(self, ExerciseKind::Essay)
    }
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// One authored question unit. Immutable once part of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: ExerciseKind,
    pub points: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Exercise {
    /// Creates a validated exercise worth one point.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` if the id is empty or the answer key is unusable.
    pub fn new(
        id: ExerciseId,
        prompt: impl Into<String>,
        kind: ExerciseKind,
    ) -> Result<Self, ExerciseError> {
        let exercise = Self {
            id,
            prompt: prompt.into(),
            kind,
            points: 1,
            difficulty: Difficulty::default(),
            explanation: None,
        };
        exercise.validate()?;
        Ok(exercise)
    }

    #[must_use]
    pub fn with_points(mut self, points: u32) -> Self {
        self.points = points;
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Check the structural rules an exercise must satisfy to be scored.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ExerciseError> {
        if self.id.is_blank() {
            return Err(ExerciseError::EmptyId);
        }
        if self.points == 0 {
            return Err(ExerciseError::ZeroPoints(self.id.clone()));
        }
        match &self.kind {
            ExerciseKind::MultipleChoice { correct, .. } if correct.is_empty() => {
                Err(ExerciseError::MissingAnswerKey(self.id.clone()))
            }
            ExerciseKind::Translation { accepted } if accepted.is_empty() => {
                Err(ExerciseError::MissingAnswerKey(self.id.clone()))
            }
            ExerciseKind::FillInBlank { blanks } => {
                if blanks.is_empty() {
                    return Err(ExerciseError::MissingAnswerKey(self.id.clone()));
                }
                let mut seen = std::collections::BTreeSet::new();
                for blank in blanks {
                    if !seen.insert(blank.position) {
                        return Err(ExerciseError::DuplicateBlank {
                            id: self.id.clone(),
                            position: blank.position,
                        });
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Human-readable answer key shown next to the learner's answer.
    ///
    /// `None` for exercises without an automatic key (essays, unknown types).
    #[must_use]
    pub fn correct_answer_display(&self) -> Option<String> {
        match &self.kind {
            ExerciseKind::SingleChoice { correct, .. } => Some(correct.clone()),
            ExerciseKind::MultipleChoice { correct, .. } => Some(correct.join(", ")),
            ExerciseKind::FillInBlank { blanks } => {
                let mut ordered: Vec<&Blank> = blanks.iter().collect();
                ordered.sort_by_key(|b| b.position);
                Some(
                    ordered
                        .iter()
                        .map(|b| b.answer.as_str())
                        .collect::<Vec<_>>()
                        .join(" | "),
                )
            }
            ExerciseKind::TrueFalse { correct } => Some(correct.to_string()),
            ExerciseKind::Translation { accepted } => accepted.first().cloned(),
            ExerciseKind::Essay | ExerciseKind::Unknown => None,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
