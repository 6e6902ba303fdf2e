use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::achievement::Achievement;
use crate::model::attempt::QuestionOutcome;
use crate::model::ids::{AttemptId, LessonId, UserId};
use crate::model::skill::Skill;

/// Score at or above which a lesson counts as completed.
pub const COMPLETION_THRESHOLD: u8 = 70;

/// Weekly target used when a learner has not picked one.
pub const DEFAULT_WEEKLY_GOAL: u32 = 5;

//
// ─── LESSON ENTRY ──────────────────────────────────────────────────────────────
//

/// Cumulative answer counters for one lesson, plus the latest attempt's breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStats {
    pub total_questions_answered: u64,
    pub total_correct_answers: u64,
    pub total_incorrect_answers: u64,
    #[serde(default)]
    pub question_answers: Vec<QuestionOutcome>,
}

/// Per (user, lesson) aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressEntry {
    pub lesson_id: LessonId,
    pub best_score: u8,
    pub attempts: u32,
    /// Minutes, summed over attempts.
    pub total_time_spent: u64,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: LessonStats,
}

impl LessonProgressEntry {
    #[must_use]
    pub fn new(lesson_id: LessonId) -> Self {
        Self {
            lesson_id,
            best_score: 0,
            attempts: 0,
            total_time_spent: 0,
            completed: false,
            completed_at: None,
            last_score: 0,
            last_attempt_at: None,
            stats: LessonStats::default(),
        }
    }
}

//
// ─── SKILL SCORE ───────────────────────────────────────────────────────────────
//

/// Latest score for one skill. Never averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScore {
    pub skill: Skill,
    pub score: u8,
    pub updated_at: DateTime<Utc>,
}

//
// ─── PROGRESS DOCUMENT ─────────────────────────────────────────────────────────
//

/// Per-user aggregate root, one per learner.
///
/// Mutated only through `merge::merge`, which returns a new document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    pub user_id: UserId,
    /// Ordered by completion time, no duplicates.
    #[serde(default)]
    pub completed_lessons: Vec<LessonId>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_streak_day: Option<NaiveDate>,
    pub weekly_goal: u32,
    #[serde(default)]
    pub weekly_progress: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_start: Option<NaiveDate>,
    #[serde(default)]
    pub achievements: BTreeSet<Achievement>,
    #[serde(default)]
    pub lessons: Vec<LessonProgressEntry>,
    #[serde(default)]
    pub skills: Vec<SkillScore>,
    /// Minutes across every lesson.
    #[serde(default)]
    pub total_time_spent: u64,
    /// Most recent attempt ids, oldest first. Bounded by the merge policy.
    #[serde(default)]
    pub applied_attempts: VecDeque<AttemptId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressDocument {
    /// Fresh document for a learner's first activity.
    #[must_use]
    pub fn new(user_id: UserId, weekly_goal: u32, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            completed_lessons: Vec::new(),
            streak: 0,
            last_streak_day: None,
            weekly_goal,
            weekly_progress: 0,
            week_start: None,
            achievements: BTreeSet::new(),
            lessons: Vec::new(),
            skills: Vec::new(),
            total_time_spent: 0,
            applied_attempts: VecDeque::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn lesson(&self, lesson_id: &LessonId) -> Option<&LessonProgressEntry> {
        self.lessons.iter().find(|e| &e.lesson_id == lesson_id)
    }

    #[must_use]
    pub fn skill(&self, skill: Skill) -> Option<&SkillScore> {
        self.skills.iter().find(|s| s.skill == skill)
    }

    #[must_use]
    pub fn has_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    #[must_use]
    pub fn has_applied(&self, attempt_id: AttemptId) -> bool {
        self.applied_attempts.contains(&attempt_id)
    }

    /// Returns the entry for `lesson_id`, inserting an empty one if missing.
    pub(crate) fn lesson_entry_mut(&mut self, lesson_id: &LessonId) -> &mut LessonProgressEntry {
        let idx = match self.lessons.iter().position(|e| &e.lesson_id == lesson_id) {
            Some(idx) => idx,
            None => {
                self.lessons.push(LessonProgressEntry::new(lesson_id.clone()));
                self.lessons.len() - 1
            }
        };
        &mut self.lessons[idx]
    }

    /// Set-semantics insert. Returns true when the id was new.
    pub(crate) fn mark_completed(&mut self, lesson_id: &LessonId) -> bool {
        if self.has_completed(lesson_id) {
            return false;
        }
        self.completed_lessons.push(lesson_id.clone());
        true
    }

    pub(crate) fn upsert_skill(&mut self, skill: Skill, score: u8, at: DateTime<Utc>) {
        let entry = SkillScore {
            skill,
            score,
            updated_at: at,
        };
        match self.skills.iter_mut().find(|s| s.skill == skill) {
            Some(existing) => *existing = entry,
            None => self.skills.push(entry),
        }
    }

    pub(crate) fn remember_attempt(&mut self, attempt_id: AttemptId, capacity: usize) {
        if capacity == 0 {
            return;
        }
        self.applied_attempts.push_back(attempt_id);
        while self.applied_attempts.len() > capacity {
            self.applied_attempts.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn doc() -> ProgressDocument {
        ProgressDocument::new(UserId::new("u1"), DEFAULT_WEEKLY_GOAL, fixed_now())
    }

    #[test]
    fn completed_lessons_have_set_semantics() {
        let mut doc = doc();
        assert!(doc.mark_completed(&LessonId::new("a")));
        assert!(!doc.mark_completed(&LessonId::new("a")));
        assert_eq!(doc.completed_lessons.len(), 1);
    }

    #[test]
    fn skill_upsert_replaces_instead_of_averaging() {
        let mut doc = doc();
        doc.upsert_skill(Skill::Grammar, 90, fixed_now());
        doc.upsert_skill(Skill::Grammar, 40, fixed_now());
        assert_eq!(doc.skills.len(), 1);
        assert_eq!(doc.skill(Skill::Grammar).unwrap().score, 40);
    }

    #[test]
    fn attempt_ledger_is_bounded() {
        let mut doc = doc();
        let ids: Vec<_> = (0..4).map(|_| AttemptId::generate()).collect();
        for id in &ids {
            doc.remember_attempt(*id, 3);
        }
        assert_eq!(doc.applied_attempts.len(), 3);
        assert!(!doc.has_applied(ids[0]));
        assert!(doc.has_applied(ids[3]));
    }

    #[test]
    fn document_survives_json_round_trip() {
        let mut doc = doc();
        doc.lesson_entry_mut(&LessonId::new("l1")).best_score = 80;
        doc.achievements.insert(Achievement::FirstLesson);
        let json = serde_json::to_string(&doc).unwrap();
        let back: ProgressDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
