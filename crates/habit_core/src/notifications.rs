use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::habit::Habit;
use crate::score::pending_count;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub scheduled_for: NaiveDateTime,
    /// Whether the notification should stay until dismissed.
    pub sticky: bool,
}

/// Short-lived status messages surfaced after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    HabitAdded,
    HabitDeleted,
    DateLocked(NaiveDate),
    PastDatesAutoMarked(usize),
    BackupCompleted,
    Imported(usize),
    Failed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::HabitAdded => "Habit added successfully!".to_string(),
            Self::HabitDeleted => "Habit deleted successfully!".to_string(),
            Self::DateLocked(_) => "Past dates are locked and cannot be modified!".to_string(),
            Self::PastDatesAutoMarked(_) => "Previous day auto-marked as incomplete".to_string(),
            Self::BackupCompleted => "Auto-backup completed!".to_string(),
            Self::Imported(count) => format!("Imported {count} habit(s) successfully!"),
            Self::Failed(reason) => format!("Error: {reason}"),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::DateLocked(_) | Self::Failed(_))
    }
}

/// Platform-specific notification adapters will implement this trait.
pub trait NotificationSink: Send + Sync {
    fn schedule(&self, notification: NotificationRequest);
    fn notice(&self, notice: &Notice);
}

/// End-of-day reminder listing how many habits are still open on `today`.
pub fn daily_reminder(habits: &[Habit], today: NaiveDate, at: NaiveDateTime) -> NotificationRequest {
    let pending = pending_count(habits, today);
    if pending > 0 {
        NotificationRequest {
            title: "Habit Tracker Reminder".to_string(),
            body: format!(
                "You have {pending} habit(s) to complete today!\nDon't break the streak!"
            ),
            scheduled_for: at,
            sticky: true,
        }
    } else {
        NotificationRequest {
            title: "Habit Tracker".to_string(),
            body: "Great job! All habits completed today!".to_string(),
            scheduled_for: at,
            sticky: false,
        }
    }
}
