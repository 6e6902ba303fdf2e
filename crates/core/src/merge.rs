//! Folding a finished attempt into a learner's progress document.
//!
//! `merge` is pure: it takes the previous document (or `None` for a learner's first
//! activity) and returns a new one. Persistence and concurrency control live in the
//! storage and services crates.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Achievement, AttemptResult, COMPLETION_THRESHOLD, DEFAULT_WEEKLY_GOAL, ProgressDocument,
    UserId,
};
use crate::streak::{recompute_streak, roll_week};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Validation failures. Nothing is merged when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MergeError {
    #[error("user id cannot be empty")]
    EmptyUserId,

    #[error("lesson id cannot be empty")]
    EmptyLessonId,

    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(i64),

    #[error("progress document belongs to {found}, not {expected}")]
    UserMismatch { expected: UserId, found: UserId },
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Tunables of the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Weekly goal given to newly created documents.
    pub default_weekly_goal: u32,
    /// How many recent attempt ids are remembered for duplicate detection.
    pub attempt_history: usize,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            default_weekly_goal: DEFAULT_WEEKLY_GOAL,
            attempt_history: 64,
        }
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub document: ProgressDocument,
    /// The attempt id had already been merged; `document` is the previous state.
    pub already_applied: bool,
    /// This merge moved the lesson to completed.
    pub newly_completed: bool,
    pub new_achievements: Vec<Achievement>,
}

//
// ─── MERGE ─────────────────────────────────────────────────────────────────────
//

/// Reject attempts that must never reach the progress document.
///
/// # Errors
///
/// Returns `MergeError` for a blank lesson id or a score above 100.
pub fn validate_attempt(attempt: &AttemptResult) -> Result<(), MergeError> {
    if attempt.lesson_id().is_blank() {
        return Err(MergeError::EmptyLessonId);
    }
    if attempt.score() > 100 {
        return Err(MergeError::ScoreOutOfRange(i64::from(attempt.score())));
    }
    Ok(())
}

/// Merge `attempt` into `previous`, producing the next document.
///
/// # Errors
///
/// Returns `MergeError` when the attempt or user id fails validation, or when
/// `previous` belongs to another user.
pub fn merge(
    previous: Option<ProgressDocument>,
    user_id: &UserId,
    attempt: &AttemptResult,
    now: DateTime<Utc>,
    policy: &MergePolicy,
) -> Result<MergeOutcome, MergeError> {
    if user_id.is_blank() {
        return Err(MergeError::EmptyUserId);
    }
    validate_attempt(attempt)?;

    let mut doc = match previous {
        Some(doc) if &doc.user_id != user_id => {
            return Err(MergeError::UserMismatch {
                expected: user_id.clone(),
                found: doc.user_id,
            });
        }
        Some(doc) => doc,
        None => ProgressDocument::new(user_id.clone(), policy.default_weekly_goal, now),
    };

    if doc.has_applied(attempt.attempt_id()) {
        return Ok(MergeOutcome {
            document: doc,
            already_applied: true,
            newly_completed: false,
            new_achievements: Vec::new(),
        });
    }

    let today = now.date_naive();
    let score = attempt.score();
    let minutes = u64::from(attempt.time_spent_minutes());
    let totals = attempt.totals();

    let newly_completed = {
        let entry = doc.lesson_entry_mut(attempt.lesson_id());
        entry.best_score = entry.best_score.max(score);
        entry.total_time_spent = entry.total_time_spent.saturating_add(minutes);
        entry.attempts = entry.attempts.saturating_add(1);
        entry.last_score = score;
        entry.last_attempt_at = Some(now);

        entry.stats.total_questions_answered = entry
            .stats
            .total_questions_answered
            .saturating_add(u64::from(totals.total_questions_answered));
        entry.stats.total_correct_answers = entry
            .stats
            .total_correct_answers
            .saturating_add(u64::from(totals.total_correct));
        entry.stats.total_incorrect_answers = entry
            .stats
            .total_incorrect_answers
            .saturating_add(u64::from(totals.total_incorrect));
        // Detail view shows the latest attempt only.
        entry.stats.question_answers = attempt.outcomes().to_vec();

        if entry.best_score >= COMPLETION_THRESHOLD && !entry.completed {
            entry.completed = true;
            entry.completed_at = Some(now);
            true
        } else {
            false
        }
    };

    doc.total_time_spent = doc.total_time_spent.saturating_add(minutes);

    let (week, mut weekly_progress) = roll_week(doc.week_start, doc.weekly_progress, today);
    if newly_completed && doc.mark_completed(attempt.lesson_id()) {
        weekly_progress = weekly_progress.saturating_add(1);
    }
    doc.week_start = Some(week);
    doc.weekly_progress = weekly_progress;

    if let Some(skill) = attempt.skill() {
        doc.upsert_skill(skill, score, now);
    }

    if score >= COMPLETION_THRESHOLD {
        doc.streak = recompute_streak(doc.streak, doc.last_streak_day, today);
        if doc.last_streak_day.is_none_or(|last| last < today) {
            doc.last_streak_day = Some(today);
        }
    }

    let new_achievements = unlock_achievements(&mut doc, score);

    doc.remember_attempt(attempt.attempt_id(), policy.attempt_history);
    doc.updated_at = now;

    Ok(MergeOutcome {
        document: doc,
        already_applied: false,
        newly_completed,
        new_achievements,
    })
}

/// Adds every achievement the document now satisfies and returns the new ones.
fn unlock_achievements(doc: &mut ProgressDocument, score: u8) -> Vec<Achievement> {
    let completed = doc.completed_lessons.len();
    let rules = [
        (Achievement::FirstLesson, completed >= 1),
        (Achievement::FiveLessons, completed >= 5),
        (Achievement::TenLessons, completed >= 10),
        (Achievement::PerfectScore, score == 100),
        (Achievement::ThreeDayStreak, doc.streak >= 3),
        (Achievement::WeekStreak, doc.streak >= 7),
        (
            Achievement::WeeklyGoalMet,
            doc.weekly_goal > 0 && doc.weekly_progress >= doc.weekly_goal,
        ),
    ];

    rules
        .into_iter()
        .filter(|(achievement, satisfied)| *satisfied && doc.achievements.insert(*achievement))
        .map(|(achievement, _)| achievement)
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttemptId, AttemptTotals, ExerciseId, LessonId, OutcomeStatus, QuestionOutcome, Skill,
    };
    use crate::time::fixed_now;
    use chrono::Duration;

    fn user() -> UserId {
        UserId::new("learner-1")
    }

    fn attempt(lesson: &str, score: u8) -> AttemptResult {
        attempt_with(lesson, score, Some(Skill::Grammar))
    }

    fn attempt_with(lesson: &str, score: u8, skill: Option<Skill>) -> AttemptResult {
        AttemptResult::from_reported(
            AttemptId::generate(),
            LessonId::new(lesson),
            skill,
            score,
            4,
            vec![QuestionOutcome {
                exercise_id: ExerciseId::new(format!("{lesson}-q{score}")),
                status: OutcomeStatus::Correct,
                user_answer: Some("a".into()),
                correct_answer: Some("a".into()),
                explanation: None,
                points_earned: 1,
            }],
            AttemptTotals::new(4, 3, 1).unwrap(),
            fixed_now(),
        )
    }

    fn merge_at(
        previous: Option<ProgressDocument>,
        attempt: &AttemptResult,
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        merge(previous, &user(), attempt, now, &MergePolicy::default()).unwrap()
    }

    #[test]
    fn first_merge_creates_document_and_entry() {
        let out = merge_at(None, &attempt("l1", 50), fixed_now());
        let entry = out.document.lesson(&LessonId::new("l1")).unwrap();
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.best_score, 50);
        assert_eq!(entry.total_time_spent, 4);
        assert!(!entry.completed);
        assert_eq!(out.document.weekly_goal, DEFAULT_WEEKLY_GOAL);
        assert_eq!(out.document.created_at, fixed_now());
    }

    #[test]
    fn completion_boundary_is_seventy() {
        let below = merge_at(None, &attempt("l1", 69), fixed_now());
        let entry = below.document.lesson(&LessonId::new("l1")).unwrap();
        assert!(!entry.completed);
        assert!(entry.completed_at.is_none());
        assert!(below.document.completed_lessons.is_empty());
        assert!(!below.newly_completed);

        let at = merge_at(None, &attempt("l1", 70), fixed_now());
        let entry = at.document.lesson(&LessonId::new("l1")).unwrap();
        assert!(entry.completed);
        assert_eq!(entry.completed_at, Some(fixed_now()));
        assert_eq!(at.document.completed_lessons, vec![LessonId::new("l1")]);
        assert!(at.newly_completed);
    }

    #[test]
    fn best_score_never_decreases() {
        let scores = [40, 90, 10, 85, 100, 0, 72];
        let mut doc = None;
        let mut best = 0;
        for score in scores {
            let out = merge_at(doc, &attempt("l1", score), fixed_now());
            best = best.max(score);
            let entry = out.document.lesson(&LessonId::new("l1")).unwrap();
            assert_eq!(entry.best_score, best);
            assert_eq!(entry.completed, entry.best_score >= COMPLETION_THRESHOLD);
            doc = Some(out.document);
        }
        let doc = doc.unwrap();
        assert_eq!(doc.lesson(&LessonId::new("l1")).unwrap().attempts, 7);
        assert_eq!(doc.completed_lessons.len(), 1);
    }

    #[test]
    fn second_attempt_completes_lesson_at_its_own_time() {
        let first_at = fixed_now();
        let second_at = fixed_now() + Duration::hours(3);

        let first = merge_at(None, &attempt("l1", 60), first_at);
        let second = merge_at(Some(first.document), &attempt("l1", 85), second_at);

        let entry = second.document.lesson(&LessonId::new("l1")).unwrap();
        assert_eq!(entry.best_score, 85);
        assert_eq!(entry.attempts, 2);
        assert!(entry.completed);
        assert_eq!(entry.completed_at, Some(second_at));
    }

    #[test]
    fn re_merging_same_attempt_is_a_no_op() {
        let result = attempt("l1", 80);
        let first = merge_at(None, &result, fixed_now());
        let second = merge_at(
            Some(first.document.clone()),
            &result,
            fixed_now() + Duration::minutes(1),
        );

        assert!(second.already_applied);
        assert_eq!(second.document, first.document);
        let entry = second.document.lesson(&LessonId::new("l1")).unwrap();
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.best_score, 80);
    }

    #[test]
    fn stats_accumulate_but_detail_is_last_attempt_wins() {
        let first = merge_at(None, &attempt("l1", 50), fixed_now());
        let latest = attempt("l1", 75);
        let second = merge_at(Some(first.document), &latest, fixed_now());

        let stats = &second.document.lesson(&LessonId::new("l1")).unwrap().stats;
        assert_eq!(stats.total_questions_answered, 8);
        assert_eq!(stats.total_correct_answers, 6);
        assert_eq!(stats.total_incorrect_answers, 2);
        assert_eq!(stats.question_answers, latest.outcomes().to_vec());
    }

    #[test]
    fn skill_score_tracks_latest_attempt() {
        let first = merge_at(None, &attempt("l1", 95), fixed_now());
        let second = merge_at(Some(first.document), &attempt("l2", 30), fixed_now());
        let skill = second.document.skill(Skill::Grammar).unwrap();
        assert_eq!(skill.score, 30);

        let third = merge_at(
            Some(second.document),
            &attempt_with("l3", 90, None),
            fixed_now(),
        );
        assert_eq!(third.document.skill(Skill::Grammar).unwrap().score, 30);
        assert_eq!(third.document.skills.len(), 1);
    }

    #[test]
    fn streak_counts_passing_days() {
        let day1 = fixed_now();
        let mut doc = merge_at(None, &attempt("l1", 80), day1).document;
        assert_eq!(doc.streak, 1);

        doc = merge_at(Some(doc), &attempt("l2", 90), day1 + Duration::hours(1)).document;
        assert_eq!(doc.streak, 1);

        doc = merge_at(Some(doc), &attempt("l3", 90), day1 + Duration::days(1)).document;
        assert_eq!(doc.streak, 2);

        // failing attempts do not touch the streak
        doc = merge_at(Some(doc), &attempt("l4", 20), day1 + Duration::days(2)).document;
        assert_eq!(doc.streak, 2);

        doc = merge_at(Some(doc), &attempt("l5", 90), day1 + Duration::days(4)).document;
        assert_eq!(doc.streak, 1);
    }

    #[test]
    fn weekly_progress_counts_new_completions_and_resets() {
        // fixed_now() is a Tuesday
        let tuesday = fixed_now();
        let mut doc = merge_at(None, &attempt("l1", 80), tuesday).document;
        doc = merge_at(Some(doc), &attempt("l1", 95), tuesday).document;
        doc = merge_at(Some(doc), &attempt("l2", 70), tuesday).document;
        assert_eq!(doc.weekly_progress, 2);

        let next_monday = tuesday + Duration::days(6);
        doc = merge_at(Some(doc), &attempt("l3", 40), next_monday).document;
        assert_eq!(doc.weekly_progress, 0);
        assert_eq!(doc.week_start, Some(next_monday.date_naive()));
    }

    #[test]
    fn achievements_unlock_once() {
        let first = merge_at(None, &attempt("l1", 100), fixed_now());
        assert!(first.new_achievements.contains(&Achievement::FirstLesson));
        assert!(first.new_achievements.contains(&Achievement::PerfectScore));

        let second = merge_at(Some(first.document), &attempt("l2", 100), fixed_now());
        assert!(second.new_achievements.is_empty());
        assert!(second.document.achievements.contains(&Achievement::PerfectScore));
    }

    #[test]
    fn weekly_goal_achievement() {
        let mut doc = ProgressDocument::new(user(), 2, fixed_now());
        doc = merge_at(Some(doc), &attempt("l1", 90), fixed_now()).document;
        let out = merge_at(Some(doc), &attempt("l2", 90), fixed_now());
        assert!(out.new_achievements.contains(&Achievement::WeeklyGoalMet));
    }

    #[test]
    fn invalid_attempts_are_rejected() {
        let policy = MergePolicy::default();
        let blank = attempt("  ", 80);
        assert_eq!(
            merge(None, &user(), &blank, fixed_now(), &policy).unwrap_err(),
            MergeError::EmptyLessonId
        );

        let too_high = attempt("l1", 101);
        assert_eq!(
            merge(None, &user(), &too_high, fixed_now(), &policy).unwrap_err(),
            MergeError::ScoreOutOfRange(101)
        );

        assert_eq!(
            merge(None, &UserId::new(""), &attempt("l1", 10), fixed_now(), &policy).unwrap_err(),
            MergeError::EmptyUserId
        );
    }

    #[test]
    fn rejects_documents_of_other_users() {
        let other = ProgressDocument::new(UserId::new("someone-else"), 5, fixed_now());
        let err = merge(
            Some(other),
            &user(),
            &attempt("l1", 10),
            fixed_now(),
            &MergePolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::UserMismatch { .. }));
    }
}
