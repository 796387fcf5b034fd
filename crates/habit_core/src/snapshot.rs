//! Versioned JSON snapshots used for manual export/import and the automatic
//! fallback backup.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HabitError, Result};
use crate::habit::Habit;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub version: u32,
    #[serde(alias = "exportDate")]
    pub timestamp: DateTime<Utc>,
    pub habits: Vec<Habit>,
}

impl BackupSnapshot {
    pub fn new(habits: &[Habit], timestamp: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp,
            habits: habits.to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(HabitError::write)
    }
}

/// Validates an external snapshot and returns the habits it carries.
///
/// Only the `habits` array is required; `version`, when present, must be 1.
pub fn parse_snapshot(raw: &str) -> Result<Vec<Habit>> {
    let value: Value = serde_json::from_str(raw).map_err(|err| format_error(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| format_error("snapshot must be a JSON object"))?;

    if let Some(version) = object.get("version") {
        if version.as_u64() != Some(u64::from(SNAPSHOT_VERSION)) {
            return Err(format_error(format!("unsupported snapshot version {version}")));
        }
    }

    let habits = object
        .get("habits")
        .filter(|habits| habits.is_array())
        .ok_or_else(|| format_error("`habits` must be an array"))?;
    let habits: Vec<Habit> =
        serde_json::from_value(habits.clone()).map_err(|err| format_error(err.to_string()))?;

    let mut seen = HashSet::new();
    for habit in &habits {
        if habit.name.trim().is_empty() {
            return Err(format_error(format!("habit {} has an empty name", habit.id)));
        }
        if !seen.insert(habit.id) {
            return Err(format_error(format!("duplicate habit id {}", habit.id)));
        }
    }
    Ok(habits)
}

/// File name offered for a manual export made on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("habit-tracker-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Writes `snapshot` to `path` through a sibling temp file.
pub fn write_backup(path: &Path, snapshot: &BackupSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(HabitError::write)?;
        }
    }
    let payload = snapshot.to_json()?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).map_err(HabitError::write)?;
    fs::rename(&tmp, path).map_err(HabitError::write)?;
    Ok(())
}

pub fn read_backup(path: &Path) -> Result<Vec<Habit>> {
    let raw = fs::read_to_string(path)
        .map_err(|err| HabitError::unavailable(format!("{}: {err}", path.display())))?;
    parse_snapshot(&raw)
}

/// Size of the persisted collection as shown in the storage panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub bytes: usize,
    pub habit_count: usize,
}

impl StorageInfo {
    pub fn measure(habits: &[Habit]) -> Result<Self> {
        let bytes = serde_json::to_vec(habits).map_err(HabitError::write)?.len();
        Ok(Self {
            bytes,
            habit_count: habits.len(),
        })
    }

    /// Size in KiB with two decimals, e.g. `0.12 KB`.
    pub fn size_label(&self) -> String {
        format!("{:.2} KB", self.bytes as f64 / 1024.0)
    }
}

fn format_error(details: impl Into<String>) -> HabitError {
    HabitError::ImportFormat {
        details: details.into(),
    }
}
