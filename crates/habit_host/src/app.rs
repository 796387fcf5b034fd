use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use habit_core::{
    clock::SystemClock,
    config::TrackerConfig,
    notifications::{Notice, NotificationRequest, NotificationSink},
    reconcile::ReconcileScope,
    store::JsonFileStore,
    HabitTracker,
};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct HostConfig {
    pub(crate) data_path: PathBuf,
    pub(crate) backup_path: Option<PathBuf>,
    pub(crate) reminder_hour: u32,
    pub(crate) backup_interval: Duration,
    pub(crate) reconcile_scope: ReconcileScope,
    pub(crate) tick_seconds: u64,
    /// Stop after this many ticks; run until killed when `None`.
    pub(crate) max_ticks: Option<u64>,
}

impl HostConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unparseable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("HABIT_DATA_PATH") {
            if !path.trim().is_empty() {
                config.data_path = PathBuf::from(path.trim());
            }
        }
        if let Some(path) = lookup("HABIT_BACKUP_PATH") {
            config.backup_path = (!path.trim().is_empty()).then(|| PathBuf::from(path.trim()));
        }
        if let Some(hour) = lookup("HABIT_REMINDER_HOUR") {
            if let Ok(value) = hour.trim().parse::<u32>() {
                if value < 24 {
                    config.reminder_hour = value;
                }
            }
        }
        if let Some(hours) = lookup("HABIT_BACKUP_INTERVAL_HOURS") {
            if let Ok(value) = hours.trim().parse::<i64>() {
                match Duration::try_hours(value) {
                    Some(interval) if value > 0 => config.backup_interval = interval,
                    Some(_) => {}
                    None => warn!(hours = value, "backup interval too large; keeping default"),
                }
            }
        }
        if let Some(scope) = lookup("HABIT_RECONCILE_SCOPE") {
            match scope.trim().to_ascii_lowercase().as_str() {
                "window" => config.reconcile_scope = ReconcileScope::VisibleWindow,
                "history" => config.reconcile_scope = ReconcileScope::SinceFirstRecord,
                other => warn!(scope = other, "unknown reconcile scope; keeping default"),
            }
        }
        if let Some(seconds) = lookup("HABIT_TICK_SECONDS") {
            if let Ok(value) = seconds.trim().parse::<u64>() {
                config.tick_seconds = value.max(1);
            }
        }
        if let Some(ticks) = lookup("HABIT_MAX_TICKS") {
            if let Ok(value) = ticks.trim().parse::<u64>() {
                config.max_ticks = Some(value);
            }
        }
        Ok(config)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            reminder_hour: self.reminder_hour,
            backup_interval: self.backup_interval,
            backup_path: self.backup_path.clone(),
            reconcile_scope: self.reconcile_scope,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("habit-data/habits.json"),
            backup_path: Some(PathBuf::from("habit-data/habit-backup.json")),
            reminder_hour: 21,
            backup_interval: Duration::hours(24),
            reconcile_scope: ReconcileScope::VisibleWindow,
            tick_seconds: 60,
            max_ticks: None,
        }
    }
}

/// Headless adapter: reminders and notices go to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn schedule(&self, notification: NotificationRequest) {
        info!(
            title = %notification.title,
            body = %notification.body,
            at = %notification.scheduled_for,
            "reminder"
        );
    }

    fn notice(&self, notice: &Notice) {
        debug!(?notice, "notice delivered");
    }
}

pub fn build_tracker(config: &HostConfig) -> Result<HabitTracker> {
    HabitTracker::builder()
        .with_store(Arc::new(JsonFileStore::new(&config.data_path)))
        .with_clock(Arc::new(SystemClock))
        .with_notification_sink(Arc::new(LogSink))
        .with_config(config.tracker_config())
        .build()
        .with_context(|| format!("unable to open habit store {}", config.data_path.display()))
}

pub fn run(config: HostConfig) -> Result<()> {
    let mut tracker = build_tracker(&config)?;
    let view = tracker.view().context("initial reconciliation failed")?;
    let storage = tracker.storage_info()?;
    info!(
        habits = storage.habit_count,
        size = %storage.size_label(),
        window = %view.range,
        "habit host started"
    );

    let mut ticks = 0_u64;
    loop {
        let report = tracker.tick();
        if !report.ran.is_empty() {
            debug!(jobs = ?report.ran, "tick finished");
        }
        for (kind, err) in &report.failed {
            warn!(?kind, %err, "job will retry on a later tick");
        }
        ticks += 1;
        if config.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
        std::thread::sleep(StdDuration::from_secs(config.tick_seconds));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = HostConfig::from_lookup(lookup(&[
            ("HABIT_DATA_PATH", "/tmp/habits.json"),
            ("HABIT_REMINDER_HOUR", "30"),
            ("HABIT_BACKUP_INTERVAL_HOURS", "12"),
            ("HABIT_RECONCILE_SCOPE", "history"),
            ("HABIT_TICK_SECONDS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/tmp/habits.json"));
        assert_eq!(config.reminder_hour, 21);
        assert_eq!(config.backup_interval, Duration::hours(12));
        assert_eq!(config.reconcile_scope, ReconcileScope::SinceFirstRecord);
        assert_eq!(config.tick_seconds, 1);
        assert!(config.tracker_config().validate().is_ok());
    }

    #[test]
    fn oversized_backup_interval_keeps_default() {
        for hours in ["3000000000000000", "9223372036854775807", "-5"] {
            let config =
                HostConfig::from_lookup(lookup(&[("HABIT_BACKUP_INTERVAL_HOURS", hours)])).unwrap();
            assert_eq!(config.backup_interval, Duration::hours(24));
            assert!(config.tracker_config().validate().is_ok());
        }
    }

    #[test]
    fn empty_backup_path_disables_backups() {
        let config = HostConfig::from_lookup(lookup(&[("HABIT_BACKUP_PATH", "")])).unwrap();
        assert!(config.tracker_config().backup_path.is_none());
    }

    #[test]
    fn single_tick_run_writes_backup() {
        let dir = tempdir().expect("tempdir");
        let config = HostConfig {
            data_path: dir.path().join("habits.json"),
            backup_path: Some(dir.path().join("backup.json")),
            max_ticks: Some(1),
            ..HostConfig::default()
        };
        run(config).expect("run host");
        assert!(dir.path().join("backup.json").exists());
    }
}
