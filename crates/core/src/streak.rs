//! Calendar arithmetic for streaks and weekly goals.
//!
//! Days are UTC calendar days; weeks start on Monday.

use chrono::NaiveDate;

use crate::time::week_start;

/// Streak after activity on `today`.
///
/// - first activity ever: 1
/// - same day as the previous activity: unchanged (at least 1)
/// - the day after: +1
/// - a skipped day: back to 1
/// - `today` earlier than the previous activity (clock skew): unchanged
#[must_use]
pub fn recompute_streak(
    previous_streak: u32,
    previous_activity: Option<NaiveDate>,
    today: NaiveDate,
) -> u32 {
    let Some(previous) = previous_activity else {
        return 1;
    };
    match (today - previous).num_days() {
        0 => previous_streak.max(1),
        1 => previous_streak.saturating_add(1),
        d if d < 0 => previous_streak,
        _ => 1,
    }
}

/// Streak as it should be displayed on `today`: zero once a full day was missed.
#[must_use]
pub fn current_streak(streak: u32, last_activity: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_activity {
        Some(last) if (today - last).num_days() <= 1 => streak,
        _ => 0,
    }
}

/// Weekly progress carried into the week containing `today`.
///
/// Returns the week's Monday and the progress count, reset to 0 on a new week.
#[must_use]
pub fn roll_week(
    current_week: Option<NaiveDate>,
    weekly_progress: u32,
    today: NaiveDate,
) -> (NaiveDate, u32) {
    let this_week = week_start(today);
    match current_week {
        Some(week) if week == this_week => (this_week, weekly_progress),
        // A stored week in the future means the clock went backwards; keep counting.
        Some(week) if week > this_week => (week, weekly_progress),
        _ => (this_week, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_activity_starts_streak() {
        assert_eq!(recompute_streak(0, None, day(2024, 3, 4)), 1);
    }

    #[test]
    fn same_day_keeps_streak() {
        let d = day(2024, 3, 4);
        assert_eq!(recompute_streak(4, Some(d), d), 4);
        assert_eq!(recompute_streak(0, Some(d), d), 1);
    }

    #[test]
    fn consecutive_day_increments() {
        let d = day(2024, 2, 28);
        assert_eq!(recompute_streak(4, Some(d), d + Duration::days(1)), 5);
        // across a leap day and a month boundary
        assert_eq!(recompute_streak(5, Some(day(2024, 2, 29)), day(2024, 3, 1)), 6);
    }

    #[test]
    fn skipped_day_resets_to_one() {
        let d = day(2024, 3, 4);
        assert_eq!(recompute_streak(9, Some(d), d + Duration::days(2)), 1);
        assert_eq!(recompute_streak(9, Some(d), d + Duration::days(30)), 1);
    }

    #[test]
    fn clock_skew_leaves_streak_alone() {
        let d = day(2024, 3, 4);
        assert_eq!(recompute_streak(3, Some(d), d - Duration::days(1)), 3);
    }

    #[test]
    fn displayed_streak_decays_after_a_missed_day() {
        let d = day(2024, 3, 4);
        assert_eq!(current_streak(3, Some(d), d), 3);
        assert_eq!(current_streak(3, Some(d), d + Duration::days(1)), 3);
        assert_eq!(current_streak(3, Some(d), d + Duration::days(2)), 0);
        assert_eq!(current_streak(3, None, d), 0);
    }

    #[test]
    fn week_rolls_over_on_monday() {
        let sunday = day(2024, 3, 10);
        let monday = day(2024, 3, 11);
        let (week, progress) = roll_week(None, 0, sunday);
        assert_eq!(week, day(2024, 3, 4));
        assert_eq!(progress, 0);

        assert_eq!(roll_week(Some(week), 3, sunday), (week, 3));
        assert_eq!(roll_week(Some(week), 3, monday), (monday, 0));
    }
}
