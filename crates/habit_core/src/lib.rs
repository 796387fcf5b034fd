pub mod clock;
pub mod config;
pub mod error;
pub mod habit;
pub mod notifications;
pub mod reconcile;
pub mod record;
pub mod scheduler;
pub mod score;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod window;

pub use crate::error::{HabitError, Result};
pub use crate::habit::{Habit, HabitId, RecordState};
pub use crate::service::{HabitTracker, HabitTrackerBuilder};
