//! Resolve the effective opening hours of a calendar date.
//!
//! A location has a recurring weekly schedule keyed by a Monday-first weekday
//! index and a set of special dates. A special date fully replaces the weekly
//! entry for that date, including when it marks the day as closed.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::slot::{SlotInterval, TimeSlot};

/// Opening hours for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// First start slot. Ignored when closed.
    #[serde(default)]
    pub opening: TimeSlot,
    /// Last end slot; never offered as a start.
    #[serde(default)]
    pub closing: TimeSlot,
    pub is_open: bool,
}

impl DaySchedule {
    pub fn open(opening: TimeSlot, closing: TimeSlot) -> Self {
        DaySchedule {
            opening,
            closing,
            is_open: true,
        }
    }

    pub fn closed() -> Self {
        DaySchedule {
            opening: TimeSlot::MIDNIGHT,
            closing: TimeSlot::MIDNIGHT,
            is_open: false,
        }
    }

    /// An open day must close strictly after it opens.
    pub fn validate(&self) -> Result<()> {
        if self.is_open && self.closing <= self.opening {
            return Err(SlotError::Config(format!(
                "day opens at {} but closes at {}",
                self.opening, self.closing
            )));
        }
        Ok(())
    }

    /// [`validate`](Self::validate), plus both boundaries of an open day
    /// must lie on the `interval` grid.
    pub fn validate_on(&self, interval: SlotInterval) -> Result<()> {
        self.validate()?;
        if self.is_open {
            interval.check_aligned(self.opening)?;
            interval.check_aligned(self.closing)?;
        }
        Ok(())
    }
}

/// Recurring schedule keyed by Monday-first weekday index (`0` = Monday,
/// `6` = Sunday).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule(BTreeMap<u8, DaySchedule>);

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schedule for a Monday-first weekday index.
    pub fn with_day(mut self, weekday: u8, schedule: DaySchedule) -> Self {
        self.0.insert(weekday, schedule);
        self
    }

    pub fn get(&self, weekday: u8) -> Option<&DaySchedule> {
        self.0.get(&weekday)
    }

    /// Reject weekday keys outside `0..=6`, inverted opening hours and
    /// boundaries off the `interval` grid.
    pub fn validate(&self, interval: SlotInterval) -> Result<()> {
        for (weekday, schedule) in &self.0 {
            if *weekday > 6 {
                return Err(SlotError::Config(format!(
                    "weekday index {} is outside 0..=6",
                    weekday
                )));
            }
            schedule
                .validate_on(interval)
                .map_err(|e| e.in_context(format!("weekday {}", weekday)))?;
        }
        Ok(())
    }
}

/// Calendar-specific overrides of the weekly schedule.
pub type SpecialDates = BTreeMap<NaiveDate, DaySchedule>;

/// Map a Sunday-first weekday index (`0` = Sunday .. `6` = Saturday), the
/// convention used by most browser and locale calendars, onto the Monday-first
/// index (`0` = Monday .. `6` = Sunday) that weekly schedules are keyed by.
///
/// ```
/// use slot_engine::schedule::homologate_weekday;
///
/// assert_eq!(homologate_weekday(0).unwrap(), 6); // Sunday
/// assert_eq!(homologate_weekday(1).unwrap(), 0); // Monday
/// assert_eq!(homologate_weekday(6).unwrap(), 5); // Saturday
/// ```
///
/// # Errors
/// Returns `SlotError::Config` for indexes above 6.
pub fn homologate_weekday(sunday_first: u32) -> Result<u8> {
    const SUNDAY_FIRST_TO_MONDAY_FIRST: [u8; 7] = [6, 0, 1, 2, 3, 4, 5];

    SUNDAY_FIRST_TO_MONDAY_FIRST
        .get(sunday_first as usize)
        .copied()
        .ok_or_else(|| {
            SlotError::Config(format!("weekday index {} is outside 0..=6", sunday_first))
        })
}

/// Resolve the schedule in force on `date`.
///
/// A special date wins verbatim, closed or not. Otherwise the date's weekday
/// is homologated to a Monday-first index and looked up in `weekly`.
///
/// # Errors
/// Returns `SlotError::Config` when the weekly schedule has no entry for the
/// date's weekday.
pub fn resolve_day_schedule(
    weekly: &WeeklySchedule,
    specials: &SpecialDates,
    date: NaiveDate,
) -> Result<DaySchedule> {
    if let Some(special) = specials.get(&date) {
        tracing::debug!(%date, is_open = special.is_open, "special date overrides weekly schedule");
        return Ok(*special);
    }

    let weekday = homologate_weekday(date.weekday().num_days_from_sunday())?;
    weekly.get(weekday).copied().ok_or_else(|| {
        SlotError::Config(format!(
            "no weekly schedule for weekday {} ({})",
            weekday,
            date.weekday()
        ))
    })
}
