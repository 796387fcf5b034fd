//! Two-week date windows anchored on Mondays, and past/today classification.
//!
//! All functions take `today` explicitly; nothing here reads the system clock.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};

pub const WINDOW_DAYS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub offset: i64,
    dates: Vec<NaiveDate>,
}

impl DateWindow {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn start(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end(&self) -> NaiveDate {
        self.dates[WINDOW_DAYS - 1]
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    pub fn label(&self) -> WindowLabel {
        WindowLabel::from_offset(self.offset)
    }

    /// Header text such as `Jan 1 - Jan 14, 2024`.
    pub fn range_label(&self) -> String {
        format!(
            "{} - {}",
            self.start().format("%b %-d"),
            self.end().format("%b %-d, %Y")
        )
    }
}

/// Monday on or before `date`; Sunday belongs to the week that began six days earlier.
/// `None` only at the very start of the calendar range.
pub fn monday_on_or_before(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(Duration::days(i64::from(
        date.weekday().num_days_from_monday(),
    )))
}

/// The 14 consecutive dates of window `offset`, relative to the window containing `today`.
///
/// Fails with [`HabitError::WindowOutOfRange`] when the window would fall
/// outside the dates chrono can represent.
pub fn week_window(today: NaiveDate, offset: i64) -> Result<DateWindow> {
    let out_of_range = || HabitError::WindowOutOfRange { offset };
    let shift = offset
        .checked_mul(WINDOW_DAYS as i64)
        .and_then(Duration::try_days)
        .ok_or_else(out_of_range)?;
    let start = monday_on_or_before(today)
        .and_then(|monday| monday.checked_add_signed(shift))
        .ok_or_else(out_of_range)?;
    let dates = (0..WINDOW_DAYS as i64)
        .map(|day| start.checked_add_signed(Duration::days(day)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(out_of_range)?;
    Ok(DateWindow { offset, dates })
}

pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

pub fn is_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| HabitError::InvalidDate {
        input: input.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowLabel {
    Current,
    Next,
    Last,
    WeeksAhead(u64),
    WeeksAgo(u64),
}

impl WindowLabel {
    pub fn from_offset(offset: i64) -> Self {
        match offset {
            0 => Self::Current,
            1 => Self::Next,
            -1 => Self::Last,
            n if n > 0 => Self::WeeksAhead(n.unsigned_abs() * 2),
            n => Self::WeeksAgo(n.unsigned_abs() * 2),
        }
    }
}

impl fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "This 2 Weeks"),
            Self::Next => write!(f, "Next 2 Weeks"),
            Self::Last => write!(f, "Last 2 Weeks"),
            Self::WeeksAhead(weeks) => write!(f, "{weeks} Weeks Ahead"),
            Self::WeeksAgo(weeks) => write!(f, "{weeks} Weeks Ago"),
        }
    }
}
