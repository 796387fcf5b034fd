use chrono::NaiveDate;
use thiserror::Error;

use crate::habit::HabitId;

pub type Result<T> = std::result::Result<T, HabitError>;

/// Every failure the tracker can report. None of them are fatal to the host.
#[derive(Debug, Error)]
pub enum HabitError {
    #[error("past dates are locked and cannot be modified ({date})")]
    LockedDate { date: NaiveDate },

    #[error("habit store unavailable: {details}")]
    StorageUnavailable { details: String },

    #[error("failed to write habit store: {details}")]
    StorageWrite { details: String },

    #[error("invalid backup file format: {details}")]
    ImportFormat { details: String },

    #[error("habit {id} not found")]
    HabitNotFound { id: HabitId },

    #[error("habit name cannot be empty")]
    EmptyName,

    #[error("invalid date `{input}`, expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("window offset {offset} is outside the supported calendar range")]
    WindowOutOfRange { offset: i64 },

    #[error("invalid configuration: {details}")]
    InvalidConfig { details: String },
}

impl HabitError {
    /// Errors caused by the user's own input, shown as a transient warning
    /// instead of a failure notice.
    pub fn is_user_notice(&self) -> bool {
        matches!(
            self,
            Self::LockedDate { .. } | Self::EmptyName | Self::InvalidDate { .. }
        )
    }

    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            details: err.to_string(),
        }
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        Self::StorageWrite {
            details: err.to_string(),
        }
    }
}
