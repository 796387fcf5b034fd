use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, RecordState};
use crate::window::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyScore {
    pub date: NaiveDate,
    pub percent: u8,
}

/// Percentage of habits completed on `date`, rounded half-up; `0` without habits.
pub fn daily_score(habits: &[Habit], date: NaiveDate) -> u8 {
    let total = habits.len();
    if total == 0 {
        return 0;
    }
    let completed = habits.iter().filter(|habit| habit.is_complete_on(date)).count();
    // round(100k / n) == floor((200k + n) / 2n)
    let percent = (200 * completed + total) / (2 * total);
    u8::try_from(percent).unwrap_or(100)
}

pub fn window_scores(habits: &[Habit], window: &DateWindow) -> Vec<DailyScore> {
    window
        .dates()
        .iter()
        .map(|&date| DailyScore {
            date,
            percent: daily_score(habits, date),
        })
        .collect()
}

/// Habits not yet completed on `date`, whether unset or marked incomplete.
pub fn pending_count(habits: &[Habit], date: NaiveDate) -> usize {
    habits
        .iter()
        .filter(|habit| habit.state(date) != RecordState::Complete)
        .count()
}
