use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;

use crate::{
    clock::{Clock, SystemClock},
    config::TrackerConfig,
    error::{HabitError, Result},
    habit::{allocate_id, Habit, HabitId, RecordState},
    notifications::{daily_reminder, Notice, NotificationSink},
    reconcile::{reconcile_scoped, ReconcileOutcome},
    record,
    scheduler::{JobKind, Scheduler},
    score::{self, DailyScore},
    snapshot::{self, BackupSnapshot, StorageInfo},
    store::{HabitStore, MemoryStore, StoreMetadata},
    window::{self, DateWindow},
};

/// Everything an adapter needs to draw the grid and the trend chart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GridView {
    pub label: String,
    pub range: String,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<HabitRow>,
    pub scores: Vec<DailyScore>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HabitRow {
    pub id: HabitId,
    pub name: String,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GridCell {
    pub date: NaiveDate,
    pub state: RecordState,
    pub locked: bool,
    pub today: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub ran: Vec<JobKind>,
    pub failed: Vec<(JobKind, String)>,
}

/// Owned application state: the live habit collection, the viewed window and
/// the scheduler. Every mutation is written through to the store before the
/// call returns.
pub struct HabitTracker {
    habits: Vec<Habit>,
    window_offset: i64,
    store: Arc<dyn HabitStore>,
    clock: Arc<dyn Clock>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    scheduler: Scheduler,
    config: TrackerConfig,
}

pub struct HabitTrackerBuilder {
    store: Option<Arc<dyn HabitStore>>,
    clock: Option<Arc<dyn Clock>>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    config: TrackerConfig,
}

impl HabitTrackerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
            notification_sink: None,
            config: TrackerConfig::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn HabitStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and loads the persisted collection.
    pub fn build(self) -> Result<HabitTracker> {
        self.config.validate()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn HabitStore>);
        let habits = store.load_all()?;
        tracing::info!(count = habits.len(), "habit tracker loaded");
        Ok(HabitTracker {
            habits,
            window_offset: 0,
            store,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            notification_sink: self.notification_sink,
            scheduler: Scheduler::new(&self.config),
            config: self.config,
        })
    }
}

impl Default for HabitTrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitTracker {
    pub fn builder() -> HabitTrackerBuilder {
        HabitTrackerBuilder::new()
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn habit(&self, id: HabitId) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn window_offset(&self) -> i64 {
        self.window_offset
    }

    pub fn window(&self) -> Result<DateWindow> {
        window::week_window(self.today(), self.window_offset)
    }

    /// Steps one window back. At the edge of the calendar the offset stays
    /// where it was and [`HabitError::WindowOutOfRange`] is returned.
    pub fn previous_window(&mut self) -> Result<DateWindow> {
        let offset = self.window_offset.checked_sub(1);
        self.move_to(offset)
    }

    pub fn next_window(&mut self) -> Result<DateWindow> {
        let offset = self.window_offset.checked_add(1);
        self.move_to(offset)
    }

    pub fn current_window(&mut self) -> Result<DateWindow> {
        self.move_to(Some(0))
    }

    #[instrument(skip(self))]
    pub fn add_habit(&mut self, name: &str) -> Result<HabitId> {
        let timestamp = self.clock.now_utc().timestamp_millis();
        let id = allocate_id(&self.habits, timestamp);
        let habit = Habit::new(id, name)?;
        self.habits.push(habit);
        self.persist()?;
        self.emit(Notice::HabitAdded);
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn delete_habit(&mut self, id: HabitId) -> Result<Habit> {
        let index = self
            .habits
            .iter()
            .position(|habit| habit.id == id)
            .ok_or(HabitError::HabitNotFound { id })?;
        let removed = self.habits.remove(index);
        self.persist()?;
        self.emit(Notice::HabitDeleted);
        Ok(removed)
    }

    /// Cycles the record of habit `id` on `date`. Past dates are refused with
    /// [`HabitError::LockedDate`] and a warning notice.
    #[instrument(skip(self))]
    pub fn toggle(&mut self, id: HabitId, date: NaiveDate) -> Result<RecordState> {
        let today = self.today();
        let habit = self
            .habits
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or(HabitError::HabitNotFound { id })?;
        let next = match record::toggle(habit, date, today) {
            Ok(next) => next,
            Err(err) => {
                if let HabitError::LockedDate { date } = &err {
                    self.emit(Notice::DateLocked(*date));
                }
                return Err(err);
            }
        };
        self.persist()?;
        Ok(next)
    }

    /// Closes unset past dates in the viewed window (and beyond, depending on
    /// the configured scope). Writes only when something changed.
    pub fn reconcile_visible(&mut self) -> Result<ReconcileOutcome> {
        let today = self.today();
        let window = self.window()?;
        let outcome = reconcile_scoped(
            &mut self.habits,
            window.dates(),
            today,
            self.config.reconcile_scope,
        );
        if outcome.changed() {
            tracing::debug!(marked = outcome.marked_incomplete, "reconciled past dates");
            self.persist()?;
        }
        Ok(outcome)
    }

    pub fn daily_score(&self, date: NaiveDate) -> u8 {
        score::daily_score(&self.habits, date)
    }

    pub fn window_scores(&self) -> Result<Vec<DailyScore>> {
        Ok(score::window_scores(&self.habits, &self.window()?))
    }

    /// Reconciles, then assembles the grid for the viewed window.
    pub fn view(&mut self) -> Result<GridView> {
        self.reconcile_visible()?;
        let today = self.today();
        let window = self.window()?;
        let rows = self
            .habits
            .iter()
            .map(|habit| HabitRow {
                id: habit.id,
                name: habit.name.clone(),
                cells: window
                    .dates()
                    .iter()
                    .map(|&date| GridCell {
                        date,
                        state: habit.state(date),
                        locked: window::is_past(date, today),
                        today: window::is_today(date, today),
                    })
                    .collect(),
            })
            .collect();
        Ok(GridView {
            label: window.label().to_string(),
            range: window.range_label(),
            dates: window.dates().to_vec(),
            rows,
            scores: score::window_scores(&self.habits, &window),
        })
    }

    pub fn export_snapshot(&self) -> BackupSnapshot {
        BackupSnapshot::new(&self.habits, self.clock.now_utc())
    }

    /// Replaces the collection with the habits of an external snapshot.
    /// A malformed snapshot leaves the current collection untouched.
    #[instrument(skip(self, raw))]
    pub fn import_snapshot(&mut self, raw: &str) -> Result<usize> {
        let imported = match snapshot::parse_snapshot(raw) {
            Ok(habits) => habits,
            Err(err) => {
                self.emit(Notice::Failed(err.to_string()));
                return Err(err);
            }
        };
        tracing::info!(
            replacing = self.habits.len(),
            imported = imported.len(),
            "importing snapshot"
        );
        self.habits = imported;
        self.persist()?;
        let count = self.habits.len();
        self.emit(Notice::Imported(count));
        Ok(count)
    }

    pub fn storage_info(&self) -> Result<StorageInfo> {
        StorageInfo::measure(&self.habits)
    }

    pub fn store_metadata(&self) -> Result<Option<StoreMetadata>> {
        self.store.metadata()
    }

    /// Runs every scheduled job that is due at the clock's current time.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        self.scheduler.poll(now);
        let mut report = TickReport::default();
        while let Some(job) = self.scheduler.dequeue_job() {
            match self.run_job(job.kind) {
                Ok(()) => report.ran.push(job.kind),
                Err(err) => {
                    tracing::error!(kind = ?job.kind, %err, "scheduled job failed");
                    self.emit(Notice::Failed(err.to_string()));
                    report.failed.push((job.kind, err.to_string()));
                }
            }
        }
        report
    }
}

impl HabitTracker {
    fn run_job(&mut self, kind: JobKind) -> Result<()> {
        let now = self.clock.now();
        match kind {
            JobKind::MidnightReconcile => {
                let outcome = self.reconcile_visible()?;
                self.emit(Notice::PastDatesAutoMarked(outcome.marked_incomplete));
            }
            JobKind::AutoBackup => {
                if let Some(path) = &self.config.backup_path {
                    snapshot::write_backup(path, &self.export_snapshot())?;
                    tracing::info!(path = %path.display(), "auto-backup written");
                }
                self.scheduler.mark_backup_done(now);
                self.emit(Notice::BackupCompleted);
            }
            JobKind::DailyReminder => {
                if let Some(sink) = &self.notification_sink {
                    sink.schedule(daily_reminder(&self.habits, now.date(), now));
                }
                self.scheduler.mark_reminder_sent(now.date());
            }
        }
        Ok(())
    }

    fn move_to(&mut self, offset: Option<i64>) -> Result<DateWindow> {
        let offset = offset.ok_or(HabitError::WindowOutOfRange {
            offset: self.window_offset,
        })?;
        let window = window::week_window(self.today(), offset)?;
        self.window_offset = offset;
        Ok(window)
    }

    fn persist(&self) -> Result<()> {
        let saved_at = self.clock.now_utc();
        self.store.save_all(&self.habits, saved_at).map_err(|err| {
            tracing::warn!(%err, "write-through failed; in-memory state kept");
            err
        })
    }

    fn emit(&self, notice: Notice) {
        if notice.is_warning() {
            tracing::warn!(message = %notice.message(), "notice");
        } else {
            tracing::info!(message = %notice.message(), "notice");
        }
        if let Some(sink) = &self.notification_sink {
            sink.notice(&notice);
        }
    }
}
