use std::path::PathBuf;

use chrono::Duration;

use crate::error::{HabitError, Result};
use crate::reconcile::ReconcileScope;

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Local hour (0-23) after which the daily reminder fires.
    pub reminder_hour: u32,
    pub backup_interval: Duration,
    /// Fallback snapshot written by the auto-backup job; disabled when `None`.
    pub backup_path: Option<PathBuf>,
    pub reconcile_scope: ReconcileScope,
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reminder_hour > 23 {
            return Err(HabitError::InvalidConfig {
                details: format!("reminder hour {} is outside 0-23", self.reminder_hour),
            });
        }
        if self.backup_interval <= Duration::zero() {
            return Err(HabitError::InvalidConfig {
                details: "backup interval must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            reminder_hour: 21,
            backup_interval: Duration::hours(24),
            backup_path: None,
            reconcile_scope: ReconcileScope::VisibleWindow,
        }
    }
}
