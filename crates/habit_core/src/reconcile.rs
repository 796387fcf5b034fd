//! Commits unmarked past dates to `Incomplete`.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, RecordState};
use crate::window::is_past;

/// Which past dates a reconciliation pass is allowed to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReconcileScope {
    /// Only the dates of the window being viewed.
    #[default]
    VisibleWindow,
    /// The viewed window plus every day from a habit's earliest record up to yesterday.
    SinceFirstRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub marked_incomplete: usize,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.marked_incomplete > 0
    }
}

/// Marks every unset past date in `dates` as incomplete, for every habit.
/// Dates already holding a value are never touched, so repeated calls are no-ops.
pub fn reconcile(habits: &mut [Habit], dates: &[NaiveDate], today: NaiveDate) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    for habit in habits.iter_mut() {
        for &date in dates {
            outcome.marked_incomplete += close_if_unset(habit, date, today);
        }
    }
    outcome
}

/// Runs [`reconcile`] over `dates` and, for [`ReconcileScope::SinceFirstRecord`],
/// also over each habit's history since its earliest record.
pub fn reconcile_scoped(
    habits: &mut [Habit],
    dates: &[NaiveDate],
    today: NaiveDate,
    scope: ReconcileScope,
) -> ReconcileOutcome {
    let mut outcome = reconcile(habits, dates, today);
    if scope == ReconcileScope::SinceFirstRecord {
        for habit in habits.iter_mut() {
            let Some(mut date) = habit.first_recorded() else {
                continue;
            };
            while is_past(date, today) {
                outcome.marked_incomplete += close_if_unset(habit, date, today);
                date += Duration::days(1);
            }
        }
    }
    outcome
}

fn close_if_unset(habit: &mut Habit, date: NaiveDate, today: NaiveDate) -> usize {
    if is_past(date, today) && habit.state(date) == RecordState::Unset {
        habit.set_state(date, RecordState::Incomplete);
        tracing::trace!(habit_id = %habit.id, %date, "auto-marked incomplete");
        1
    } else {
        0
    }
}
