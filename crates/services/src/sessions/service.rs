use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lesson_core::evaluator::outcome_for;
use lesson_core::model::{
    AnswerValue, AttemptId, AttemptResult, Exercise, ExerciseId, Lesson, LessonId, Submission,
};

use super::progress::SessionProgress;
use super::state::{SessionEvent, SessionState};
use crate::error::SessionError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory attempt at one lesson.
///
/// Owned by a single caller (one UI screen) and passed by `&mut`. Dropping it
/// before `finish` discards the attempt; nothing reaches the progress store.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    lesson: Lesson,
    state: SessionState,
    current: usize,
    answers: HashMap<ExerciseId, Submission>,
    elapsed: Duration,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<AttemptResult>,
    submitted: bool,
}

impl AttemptSession {
    #[must_use]
    pub fn new(lesson: Lesson) -> Self {
        Self {
            lesson,
            state: SessionState::NotStarted,
            current: 0,
            answers: HashMap::new(),
            elapsed: Duration::ZERO,
            started_at: None,
            completed_at: None,
            result: None,
            submitted: false,
        }
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.lesson.exercises.get(self.current)
    }

    #[must_use]
    pub fn answer_for(&self, exercise_id: &ExerciseId) -> Option<&Submission> {
        self.answers.get(exercise_id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Returns a summary of the current attempt progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.lesson.len();
        let answered = self.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            current_index: self.current,
            elapsed_seconds: self.elapsed.as_secs(),
            is_complete: self.is_complete(),
        }
    }

    /// Begin the attempt. Answers, position and elapsed time start from scratch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` if the session has left `NotStarted`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.state = self.state.on(SessionEvent::Start)?;
        self.current = 0;
        self.answers.clear();
        self.elapsed = Duration::ZERO;
        self.started_at = Some(now);
        tracing::debug!(
            lesson_id = %self.lesson.id,
            exercises = self.lesson.len(),
            "attempt started"
        );
        Ok(())
    }

    /// Store or overwrite the answer for `exercise_id`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownExercise` if the id is not in the lesson, or a state
    /// error when the session is not in progress.
    pub fn answer(
        &mut self,
        exercise_id: &ExerciseId,
        value: AnswerValue,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let next = self.state.on(SessionEvent::Answer)?;
        if self.lesson.exercise(exercise_id).is_none() {
            return Err(SessionError::UnknownExercise(exercise_id.clone()));
        }
        self.state = next;
        self.answers.insert(
            exercise_id.clone(),
            Submission::new(exercise_id.clone(), value, now),
        );
        Ok(())
    }

    /// Answer whichever exercise is on screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` for a lesson without exercises, plus the
    /// errors of [`AttemptSession::answer`].
    pub fn answer_current(
        &mut self,
        value: AnswerValue,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.state.on(SessionEvent::Answer)?;
        let Some(exercise) = self.current_exercise() else {
            return Err(SessionError::IndexOutOfRange {
                index: self.current,
                len: self.lesson.len(),
            });
        };
        let id = exercise.id.clone();
        self.answer(&id, value, now)
    }

    /// Move forward one exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtLastExercise` at the end of the lesson.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.state = self.state.on(SessionEvent::Navigate)?;
        if self.current + 1 >= self.lesson.len() {
            return Err(SessionError::AtLastExercise);
        }
        self.current += 1;
        Ok(self.current)
    }

    /// Move back one exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtFirstExercise` at index 0.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.state = self.state.on(SessionEvent::Navigate)?;
        if self.current == 0 {
            return Err(SessionError::AtFirstExercise);
        }
        self.current -= 1;
        Ok(self.current)
    }

    /// Jump straight to `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` past the last exercise.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.state = self.state.on(SessionEvent::Navigate)?;
        if index >= self.lesson.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.lesson.len(),
            });
        }
        self.current = index;
        Ok(self.current)
    }

    /// Timer side channel. Counts only while the attempt is in progress.
    pub fn tick(&mut self, delta: Duration) {
        if self.state.is_running() {
            self.elapsed = self.elapsed.saturating_add(delta);
        }
    }

    /// Grade every exercise and freeze the attempt.
    ///
    /// Unanswered exercises count as incorrect; essays are collected but not scored.
    ///
    /// # Errors
    ///
    /// Returns a state error unless the session is in progress, or
    /// `SessionError::Attempt` if the outcome counts overflow.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<&AttemptResult, SessionError> {
        let next = self.state.on(SessionEvent::Finish)?;

        let outcomes = self
            .lesson
            .exercises
            .iter()
            .map(|exercise| {
                let answer = self.answers.get(&exercise.id).map(|s| &s.value);
                outcome_for(exercise, answer)
            })
            .collect();

        let result = AttemptResult::from_outcomes(
            AttemptId::generate(),
            self.lesson.id.clone(),
            self.lesson.skill,
            outcomes,
            self.elapsed.as_secs(),
            now,
        )?;

        tracing::info!(
            lesson_id = %self.lesson.id,
            attempt_id = %result.attempt_id(),
            score = result.score(),
            seconds = result.time_spent_seconds(),
            "attempt finished"
        );

        self.state = next;
        self.completed_at = Some(now);
        Ok(&*self.result.insert(result))
    }

    /// The finished attempt, if any.
    #[must_use]
    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    /// The finished attempt while it has not yet reached the progress store.
    #[must_use]
    pub fn pending_result(&self) -> Option<&AttemptResult> {
        self.result.as_ref().filter(|_| !self.submitted)
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
