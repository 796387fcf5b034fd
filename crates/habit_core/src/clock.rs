use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of local wall-clock time. Every "is this date past" decision goes
/// through one of these so hosts and tests control what "today" means.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// The same instant as [`Clock::now`], as a UTC timestamp. Used for habit
    /// ids, snapshot timestamps and store metadata.
    fn now_utc(&self) -> DateTime<Utc> {
        let now = self.now();
        Local
            .from_local_datetime(&now)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| now.and_utc())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations. Its wall time is read as
/// UTC, so timestamps derived from it do not depend on the host time zone.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to 09:00 on `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(9, 0, 0).unwrap_or_default())
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock();
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().and_utc()
    }
}
