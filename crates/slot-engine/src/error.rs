//! Error types for slot-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::slot::TimeSlot;

#[derive(Error, Debug)]
pub enum SlotError {
    /// Malformed location configuration (inverted hours, missing weekday,
    /// misaligned grid). Fatal: recomputing with the same snapshot fails again.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested start is not a bookable point of the day's grid.
    #[error("Slot {0} is not a start slot on the day's grid")]
    SlotOffGrid(TimeSlot),

    /// The reservation being edited no longer matches the ledger
    /// (for example it was cancelled concurrently). Callers should re-fetch.
    #[error("Edit conflict for reservation {reservation_id}: {reason}")]
    EditConflict {
        reservation_id: String,
        reason: String,
    },

    /// A conditional admit found the slot already at capacity.
    #[error("Reservation {reservation_id} rejected: {date} {slot} has no capacity left")]
    CommitRaceRejected {
        reservation_id: String,
        date: NaiveDate,
        slot: TimeSlot,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SlotError {
    /// Prefix a configuration message with where it was found. Other
    /// variants pass through unchanged.
    pub(crate) fn in_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            SlotError::Config(message) => SlotError::Config(format!("{}: {}", context, message)),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;
