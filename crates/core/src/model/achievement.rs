use serde::{Deserialize, Serialize};
use std::fmt;

/// Named milestone stored in the progress document's achievement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Achievement {
    /// First lesson completed.
    FirstLesson,
    FiveLessons,
    TenLessons,
    /// Any attempt scoring 100.
    PerfectScore,
    ThreeDayStreak,
    WeekStreak,
    /// Weekly progress reached the weekly goal.
    WeeklyGoalMet,
}

impl Achievement {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Achievement::FirstLesson => "first-lesson",
            Achievement::FiveLessons => "five-lessons",
            Achievement::TenLessons => "ten-lessons",
            Achievement::PerfectScore => "perfect-score",
            Achievement::ThreeDayStreak => "three-day-streak",
            Achievement::WeekStreak => "week-streak",
            Achievement::WeeklyGoalMet => "weekly-goal-met",
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
