use chrono::NaiveDate;

use crate::error::{HabitError, Result};
use crate::habit::{Habit, RecordState};
use crate::window::is_past;

/// Advances `habit`'s record for `date` one step through
/// `Unset -> Complete -> Incomplete -> Unset` and returns the new state.
///
/// Past dates are locked: the record is left untouched and
/// [`HabitError::LockedDate`] is returned.
pub fn toggle(habit: &mut Habit, date: NaiveDate, today: NaiveDate) -> Result<RecordState> {
    if is_past(date, today) {
        return Err(HabitError::LockedDate { date });
    }
    let next = habit.state(date).next();
    habit.set_state(date, next);
    Ok(next)
}
