use std::fs;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use habit_core::{
    clock::{Clock, FixedClock},
    config::TrackerConfig,
    notifications::{Notice, NotificationRequest, NotificationSink},
    reconcile::reconcile,
    scheduler::JobKind,
    store::{HabitStore, JsonFileStore, MemoryStore},
    window::week_window,
    HabitError, HabitTracker, RecordState,
};
use parking_lot::Mutex;
use tempfile::tempdir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[derive(Default)]
struct RecordingSink {
    reminders: Mutex<Vec<NotificationRequest>>,
    notices: Mutex<Vec<Notice>>,
}

impl NotificationSink for RecordingSink {
    fn schedule(&self, notification: NotificationRequest) {
        self.reminders.lock().push(notification);
    }

    fn notice(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}

#[test]
fn toggled_day_survives_reconciliation_a_week_later() {
    let clock = Arc::new(FixedClock::at_date(ymd(2024, 1, 1)));
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("habits.json")));
    let mut tracker = HabitTracker::builder()
        .with_store(store.clone())
        .with_clock(clock.clone())
        .build()
        .expect("build tracker");

    let id = tracker.add_habit("Meditate").expect("add habit");
    let first_window = tracker.window().expect("window");
    assert_eq!(first_window.start(), ymd(2024, 1, 1));
    assert_eq!(
        tracker.toggle(id, ymd(2024, 1, 3)).expect("toggle"),
        RecordState::Complete
    );

    clock.advance(Duration::days(9));
    let mut habits = store.load_all().expect("load");
    let outcome = reconcile(&mut habits, first_window.dates(), clock.today());
    assert!(outcome.changed());

    let habit = &habits[0];
    assert_eq!(habit.state(ymd(2024, 1, 3)), RecordState::Complete);
    for day in 4..=9 {
        assert_eq!(habit.state(ymd(2024, 1, day)), RecordState::Incomplete);
    }
    assert_eq!(habit.state(ymd(2024, 1, 10)), RecordState::Unset);

    assert!(!reconcile(&mut habits, first_window.dates(), clock.today()).changed());
}

#[test]
fn past_days_lock_after_midnight_tick() {
    let clock = Arc::new(FixedClock::new(
        ymd(2024, 1, 3).and_hms_opt(23, 0, 0).expect("time"),
    ));
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut tracker = HabitTracker::builder()
        .with_store(store.clone())
        .with_clock(clock.clone())
        .with_notification_sink(sink.clone())
        .build()
        .expect("build tracker");
    let id = tracker.add_habit("Read").expect("add");

    let report = tracker.tick();
    assert_eq!(report.ran, vec![JobKind::DailyReminder]);
    assert_eq!(sink.reminders.lock().len(), 1);

    clock.advance(Duration::hours(2));
    let report = tracker.tick();
    assert_eq!(report.ran, vec![JobKind::MidnightReconcile]);
    assert_eq!(
        tracker.habit(id).expect("habit").state(ymd(2024, 1, 3)),
        RecordState::Incomplete
    );
    assert_eq!(
        store.persisted()[0].state(ymd(2024, 1, 3)),
        RecordState::Incomplete
    );

    let err = tracker.toggle(id, ymd(2024, 1, 3)).unwrap_err();
    assert!(matches!(err, HabitError::LockedDate { .. }));
    assert!(sink
        .notices
        .lock()
        .iter()
        .any(|notice| matches!(notice, Notice::DateLocked(_))));
}

#[test]
fn score_for_half_completed_day() {
    let today = ymd(2024, 5, 15);
    let mut tracker = HabitTracker::builder()
        .with_clock(Arc::new(FixedClock::at_date(today)))
        .build()
        .expect("build tracker");
    assert_eq!(tracker.daily_score(today), 0);
    let read = tracker.add_habit("Read").expect("add");
    tracker.add_habit("Walk").expect("add");
    tracker.toggle(read, today).expect("toggle");
    assert_eq!(tracker.daily_score(today), 50);

    let scores = tracker.window_scores().expect("scores");
    assert_eq!(scores.len(), 14);
    assert!(scores.iter().any(|score| score.date == today && score.percent == 50));
}

#[test]
fn malformed_import_leaves_collection_untouched() {
    let today = ymd(2024, 5, 15);
    let store = Arc::new(MemoryStore::new());
    let mut tracker = HabitTracker::builder()
        .with_store(store.clone())
        .with_clock(Arc::new(FixedClock::at_date(today)))
        .build()
        .expect("build tracker");
    let id = tracker.add_habit("Read").expect("add");
    tracker.toggle(id, today).expect("toggle");
    let before = tracker.habits().to_vec();
    let saves = store.save_count();

    let err = tracker
        .import_snapshot(r#"{"habits": "not-an-array"}"#)
        .unwrap_err();
    assert!(matches!(err, HabitError::ImportFormat { .. }));
    assert_eq!(tracker.habits(), before.as_slice());
    assert_eq!(store.save_count(), saves);
}

#[test]
fn export_then_import_into_fresh_tracker() {
    let today = ymd(2024, 5, 15);
    let mut source = HabitTracker::builder()
        .with_clock(Arc::new(FixedClock::at_date(today)))
        .build()
        .expect("build tracker");
    let id = source.add_habit("Read").expect("add");
    source.toggle(id, today).expect("toggle");
    let exported = source.export_snapshot().to_json().expect("export");

    let mut target = HabitTracker::builder()
        .with_clock(Arc::new(FixedClock::at_date(today)))
        .build()
        .expect("build tracker");
    target.add_habit("Old habit").expect("add");
    assert_eq!(target.import_snapshot(&exported).expect("import"), 1);
    assert_eq!(target.habits(), source.habits());
}

#[test]
fn auto_backup_writes_fallback_snapshot() {
    let dir = tempdir().expect("tempdir");
    let backup_path = dir.path().join("habit-backup.json");
    let clock = Arc::new(FixedClock::at_date(ymd(2024, 5, 15)));
    let config = TrackerConfig {
        backup_path: Some(backup_path.clone()),
        ..TrackerConfig::default()
    };
    let mut tracker = HabitTracker::builder()
        .with_clock(clock.clone())
        .with_config(config)
        .build()
        .expect("build tracker");
    tracker.add_habit("Read").expect("add");

    assert_eq!(tracker.tick().ran, vec![JobKind::AutoBackup]);
    let restored = habit_core::snapshot::read_backup(&backup_path).expect("read backup");
    assert_eq!(restored, tracker.habits());

    clock.advance(Duration::hours(1));
    assert!(tracker.tick().ran.is_empty());
    let raw = fs::read_to_string(&backup_path).expect("read");
    assert!(raw.contains("\"version\": 1"));
}

#[test]
fn reload_from_disk_preserves_tristate_records() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("habits.json");
    let today = ymd(2024, 5, 15);
    let tomorrow = today + Duration::days(1);
    {
        let mut tracker = HabitTracker::builder()
            .with_store(Arc::new(JsonFileStore::new(&path)))
            .with_clock(Arc::new(FixedClock::at_date(today)))
            .build()
            .expect("build tracker");
        let id = tracker.add_habit("Read").expect("add");
        tracker.toggle(id, today).expect("toggle");
        tracker.toggle(id, tomorrow).expect("toggle");
        tracker.toggle(id, tomorrow).expect("toggle");
    }

    let tracker = HabitTracker::builder()
        .with_store(Arc::new(JsonFileStore::new(&path)))
        .with_clock(Arc::new(FixedClock::at_date(today)))
        .build()
        .expect("rebuild tracker");
    let habit = &tracker.habits()[0];
    assert_eq!(habit.state(today), RecordState::Complete);
    assert_eq!(habit.state(tomorrow), RecordState::Incomplete);
    assert_eq!(habit.state(today + Duration::days(2)), RecordState::Unset);
    let window = week_window(today, 0).expect("window");
    assert!(window.contains(tomorrow));
}
