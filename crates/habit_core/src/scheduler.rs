//! Tick-driven replacement for wall-clock timers.
//!
//! The host calls [`Scheduler::poll`] with the current local time; due work is
//! queued as [`ScheduledJob`]s and drained with [`Scheduler::dequeue_job`].

use std::collections::VecDeque;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobKind {
    /// A local midnight passed since the last poll.
    MidnightReconcile,
    AutoBackup,
    DailyReminder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledJob {
    pub kind: JobKind,
    pub due_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct Scheduler {
    reminder_hour: u32,
    backup_interval: Duration,
    backups_enabled: bool,
    last_seen_day: Option<NaiveDate>,
    last_backup: Option<NaiveDateTime>,
    last_reminder: Option<NaiveDate>,
    pending_jobs: VecDeque<ScheduledJob>,
}

impl Scheduler {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            reminder_hour: config.reminder_hour,
            backup_interval: config.backup_interval,
            backups_enabled: config.backup_path.is_some(),
            last_seen_day: None,
            last_backup: None,
            last_reminder: None,
            pending_jobs: VecDeque::new(),
        }
    }

    /// Queues every job that became due at `now`. A kind that is already
    /// queued is not queued twice.
    pub fn poll(&mut self, now: NaiveDateTime) {
        let today = now.date();
        match self.last_seen_day {
            Some(previous) if today > previous => {
                self.enqueue(JobKind::MidnightReconcile, now);
            }
            _ => {}
        }
        if self.last_seen_day.map_or(true, |previous| today > previous) {
            self.last_seen_day = Some(today);
        }

        if self.backups_enabled {
            let due = self
                .last_backup
                .map_or(true, |last| now - last > self.backup_interval);
            if due {
                self.enqueue(JobKind::AutoBackup, now);
            }
        }

        if now.hour() >= self.reminder_hour && self.last_reminder != Some(today) {
            self.enqueue(JobKind::DailyReminder, now);
        }
    }

    pub fn dequeue_job(&mut self) -> Option<ScheduledJob> {
        self.pending_jobs.pop_front()
    }

    pub fn mark_backup_done(&mut self, at: NaiveDateTime) {
        self.last_backup = Some(at);
    }

    pub fn mark_reminder_sent(&mut self, day: NaiveDate) {
        self.last_reminder = Some(day);
    }

    fn enqueue(&mut self, kind: JobKind, due_at: NaiveDateTime) {
        if self.pending_jobs.iter().any(|job| job.kind == kind) {
            return;
        }
        tracing::debug!(?kind, %due_at, "job due");
        self.pending_jobs.push_back(ScheduledJob { kind, due_at });
    }
}
