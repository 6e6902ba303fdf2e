use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::exercise::{Exercise, ExerciseError};
use crate::model::ids::{ExerciseId, LessonId};
use crate::model::skill::Skill;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson id cannot be empty")]
    EmptyId,

    #[error("exercise id {0} appears more than once")]
    DuplicateExercise(ExerciseId),

    #[error(transparent)]
    Exercise(#[from] ExerciseError),
}

/// Ordered list of exercises delivered to the learner. Read-only input to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<Skill>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Lesson {
    /// Creates a validated lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the id is blank, exercise ids collide, or an exercise
    /// fails validation.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        skill: Option<Skill>,
        exercises: Vec<Exercise>,
    ) -> Result<Self, LessonError> {
        let lesson = Self {
            id,
            title: title.into(),
            skill,
            exercises,
        };
        lesson.validate()?;
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), LessonError> {
        if self.id.is_blank() {
            return Err(LessonError::EmptyId);
        }
        let mut seen = HashSet::with_capacity(self.exercises.len());
        for exercise in &self.exercises {
            exercise.validate()?;
            if !seen.insert(&exercise.id) {
                return Err(LessonError::DuplicateExercise(exercise.id.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn exercise(&self, id: &ExerciseId) -> Option<&Exercise> {
        self.exercises.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}
