use chrono::NaiveDate;
use serde::Serialize;

use lesson_core::model::{
    Achievement, LessonId, LessonProgressEntry, ProgressDocument, SkillScore, UserId,
};
use lesson_core::streak::{current_streak, roll_week};

/// Compact per-lesson line for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub lesson_id: LessonId,
    pub best_score: u8,
    pub last_score: u8,
    pub attempts: u32,
    pub completed: bool,
    pub total_time_spent: u64,
}

impl From<&LessonProgressEntry> for LessonSummary {
    fn from(entry: &LessonProgressEntry) -> Self {
        Self {
            lesson_id: entry.lesson_id.clone(),
            best_score: entry.best_score,
            last_score: entry.last_score,
            attempts: entry.attempts,
            completed: entry.completed,
            total_time_spent: entry.total_time_spent,
        }
    }
}

/// Read model of a progress document as of one calendar day.
///
/// Streak and weekly progress are the values a learner should see on `today`, which may
/// be lower than what is stored if they have been away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub user_id: UserId,
    pub completed_lessons: Vec<LessonId>,
    pub streak: u32,
    pub weekly_goal: u32,
    pub weekly_progress: u32,
    pub achievements: Vec<Achievement>,
    pub skills: Vec<SkillScore>,
    pub total_time_spent: u64,
    pub lessons: Vec<LessonSummary>,
}

impl ProgressSummary {
    #[must_use]
    pub fn from_document(doc: &ProgressDocument, today: NaiveDate) -> Self {
        let (_, weekly_progress) = roll_week(doc.week_start, doc.weekly_progress, today);
        Self {
            user_id: doc.user_id.clone(),
            completed_lessons: doc.completed_lessons.clone(),
            streak: current_streak(doc.streak, doc.last_streak_day, today),
            weekly_goal: doc.weekly_goal,
            weekly_progress,
            achievements: doc.achievements.iter().copied().collect(),
            skills: doc.skills.clone(),
            total_time_spent: doc.total_time_spent,
            lessons: doc.lessons.iter().map(LessonSummary::from).collect(),
        }
    }

    #[must_use]
    pub fn weekly_goal_met(&self) -> bool {
        self.weekly_goal > 0 && self.weekly_progress >= self.weekly_goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lesson_core::time::fixed_now;

    #[test]
    fn stale_streak_and_week_read_as_zero() {
        let today = fixed_now().date_naive();
        let mut doc = ProgressDocument::new(UserId::new("u1"), 3, fixed_now());
        doc.streak = 4;
        doc.last_streak_day = Some(today - Duration::days(1));
        doc.weekly_progress = 3;
        doc.week_start = Some(lesson_core::time::week_start(today));

        let fresh = ProgressSummary::from_document(&doc, today);
        assert_eq!(fresh.streak, 4);
        assert_eq!(fresh.weekly_progress, 3);
        assert!(fresh.weekly_goal_met());

        let later = ProgressSummary::from_document(&doc, today + Duration::days(9));
        assert_eq!(later.streak, 0);
        assert_eq!(later.weekly_progress, 0);
        // the stored document is untouched
        assert_eq!(doc.streak, 4);
    }
}
