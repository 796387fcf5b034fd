//! Persistence gateway for the habit collection.
//!
//! Every save replaces the whole collection; there are no incremental writes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};
use crate::habit::Habit;

pub trait HabitStore: Send + Sync {
    /// Full persisted collection, or an empty one if nothing was saved yet.
    fn load_all(&self) -> Result<Vec<Habit>>;

    /// Atomically replaces the persisted collection with `habits`, stamping
    /// the metadata with `saved_at`.
    fn save_all(&self, habits: &[Habit], saved_at: DateTime<Utc>) -> Result<()>;

    fn metadata(&self) -> Result<Option<StoreMetadata>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub last_save: DateTime<Utc>,
    pub habit_count: usize,
}

impl StoreMetadata {
    fn for_save(habits: &[Habit], saved_at: DateTime<Utc>) -> Self {
        Self {
            last_save: saved_at,
            habit_count: habits.len(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    habits: Vec<Habit>,
    #[serde(default)]
    metadata: Option<StoreMetadata>,
}

/// Single JSON document on disk, replaced through a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            HabitError::unavailable(format!("{}: {err}", self.path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        serde_json::from_str(&raw)
            .map_err(|err| HabitError::unavailable(format!("{}: {err}", self.path.display())))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HabitStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Habit>> {
        let document = self.read_document()?;
        tracing::debug!(
            path = %self.path.display(),
            count = document.habits.len(),
            "loaded habit store"
        );
        Ok(document.habits)
    }

    fn save_all(&self, habits: &[Habit], saved_at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(HabitError::write)?;
            }
        }
        let document = StoreDocument {
            habits: habits.to_vec(),
            metadata: Some(StoreMetadata::for_save(habits, saved_at)),
        };
        let payload = serde_json::to_vec_pretty(&document).map_err(HabitError::write)?;
        let tmp = self.temp_path();
        fs::write(&tmp, payload).map_err(HabitError::write)?;
        fs::rename(&tmp, &self.path).map_err(HabitError::write)?;
        tracing::debug!(path = %self.path.display(), count = habits.len(), "saved habit store");
        Ok(())
    }

    fn metadata(&self) -> Result<Option<StoreMetadata>> {
        Ok(self.read_document()?.metadata)
    }
}

/// In-process store. Writes can be made to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<StoreDocument>,
    fail_writes: RwLock<bool>,
    saves: RwLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: Vec<Habit>) -> Self {
        let store = Self::default();
        store.document.write().habits = habits;
        store
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.write() = fail;
    }

    /// Number of successful `save_all` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }

    pub fn persisted(&self) -> Vec<Habit> {
        self.document.read().habits.clone()
    }
}

impl HabitStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Habit>> {
        Ok(self.document.read().habits.clone())
    }

    fn save_all(&self, habits: &[Habit], saved_at: DateTime<Utc>) -> Result<()> {
        if *self.fail_writes.read() {
            return Err(HabitError::write("memory store rejected write"));
        }
        let mut document = self.document.write();
        document.habits = habits.to_vec();
        document.metadata = Some(StoreMetadata::for_save(habits, saved_at));
        *self.saves.write() += 1;
        Ok(())
    }

    fn metadata(&self) -> Result<Option<StoreMetadata>> {
        Ok(self.document.read().metadata.clone())
    }
}
