use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};

/// Creation-timestamp derived identifier, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct HabitId(pub i64);

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-date value of a habit. `Unset` is never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RecordState {
    #[default]
    Unset,
    Complete,
    Incomplete,
}

impl RecordState {
    /// Next state in the user toggle cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Unset => Self::Complete,
            Self::Complete => Self::Incomplete,
            Self::Incomplete => Self::Unset,
        }
    }

    fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Self::Unset,
            Some(true) => Self::Complete,
            Some(false) => Self::Incomplete,
        }
    }

    fn as_flag(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Complete => Some(true),
            Self::Incomplete => Some(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    records: BTreeMap<NaiveDate, bool>,
}

impl Habit {
    /// Creates a habit with no records. The name is trimmed and must not be empty.
    pub fn new(id: HabitId, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HabitError::EmptyName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
            records: BTreeMap::new(),
        })
    }

    pub fn state(&self, date: NaiveDate) -> RecordState {
        RecordState::from_flag(self.records.get(&date).copied())
    }

    /// Raw write used by the state machine and reconciliation; callers enforce
    /// the past-date lock.
    pub(crate) fn set_state(&mut self, date: NaiveDate, state: RecordState) {
        match state.as_flag() {
            Some(flag) => {
                self.records.insert(date, flag);
            }
            None => {
                self.records.remove(&date);
            }
        }
    }

    pub fn records(&self) -> impl Iterator<Item = (NaiveDate, RecordState)> + '_ {
        self.records
            .iter()
            .map(|(date, flag)| (*date, RecordState::from_flag(Some(*flag))))
    }

    pub fn first_recorded(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn is_complete_on(&self, date: NaiveDate) -> bool {
        self.state(date) == RecordState::Complete
    }
}

/// Picks an id for a habit created at `timestamp_ms` that is unique in `habits`.
pub fn allocate_id(habits: &[Habit], timestamp_ms: i64) -> HabitId {
    let taken = |candidate: i64| habits.iter().any(|habit| habit.id.0 == candidate);
    if !taken(timestamp_ms) {
        return HabitId(timestamp_ms);
    }
    let max = habits.iter().map(|habit| habit.id.0).max().unwrap_or(timestamp_ms);
    HabitId(max.max(timestamp_ms) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn new_habit_trims_and_rejects_blank_names() {
        let habit = Habit::new(HabitId(1), "  Read  ").unwrap();
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.records().count(), 0);
        assert!(matches!(
            Habit::new(HabitId(2), "   "),
            Err(HabitError::EmptyName)
        ));
    }

    #[test]
    fn unset_removes_the_entry() {
        let mut habit = Habit::new(HabitId(1), "Walk").unwrap();
        habit.set_state(date(3), RecordState::Complete);
        assert_eq!(habit.state(date(3)), RecordState::Complete);
        habit.set_state(date(3), RecordState::Unset);
        assert_eq!(habit.state(date(3)), RecordState::Unset);
        assert_eq!(habit.records().count(), 0);
    }

    #[test]
    fn serializes_records_as_iso_keyed_booleans() {
        let mut habit = Habit::new(HabitId(1704067200000), "Stretch").unwrap();
        habit.set_state(date(3), RecordState::Complete);
        habit.set_state(date(4), RecordState::Incomplete);
        let json = serde_json::to_value(&habit).unwrap();
        assert_eq!(json["id"], 1704067200000_i64);
        assert_eq!(json["records"]["2024-01-03"], true);
        assert_eq!(json["records"]["2024-01-04"], false);

        let parsed: Habit = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, habit);
    }

    #[test]
    fn missing_records_field_defaults_to_empty() {
        let parsed: Habit = serde_json::from_str(r#"{"id": 5, "name": "Journal"}"#).unwrap();
        assert_eq!(parsed.first_recorded(), None);
    }

    #[test]
    fn allocate_id_avoids_collisions() {
        let habits = vec![
            Habit::new(HabitId(100), "a").unwrap(),
            Habit::new(HabitId(105), "b").unwrap(),
        ];
        assert_eq!(allocate_id(&habits, 200), HabitId(200));
        assert_eq!(allocate_id(&habits, 100), HabitId(106));
    }
}
