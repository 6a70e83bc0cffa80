//! Validated time-of-day value objects and the daily slot grid.
//!
//! A [`TimeSlot`] is a minute-of-day rendered as `HH:MM`. Malformed text is
//! rejected when the value is built, never later at lookup time, so every
//! slot key reaching the ledger or the engine is already known to be valid.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// Minutes in a day. `24:00` is accepted as a closing time.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Grid step used when a location does not configure one.
pub const DEFAULT_INTERVAL_MINUTES: u16 = 30;

/// A point on a day's slot grid, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(u16);

impl TimeSlot {
    pub const MIDNIGHT: TimeSlot = TimeSlot(0);

    /// Build a slot from an hour and minute. `24:00` is the only valid slot past `23:59`.
    pub fn new(hour: u16, minute: u16) -> Result<Self> {
        if minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(SlotError::InvalidTimeSlot(format!(
                "{:02}:{:02}",
                hour, minute
            )));
        }
        Ok(TimeSlot(hour * 60 + minute))
    }

    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes > MINUTES_PER_DAY {
            return Err(SlotError::InvalidTimeSlot(format!(
                "{} minutes past midnight",
                minutes
            )));
        }
        Ok(TimeSlot(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// The next slot `interval` later, or `None` past the end of the day.
    pub fn checked_add(self, interval: SlotInterval) -> Option<TimeSlot> {
        let next = self.0 + interval.minutes();
        (next <= MINUTES_PER_DAY).then_some(TimeSlot(next))
    }

    /// Local wall-clock instant of this slot on `date`. `24:00` maps to
    /// midnight of the following day.
    pub fn on_date(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(self.0))
    }
}

impl Default for TimeSlot {
    fn default() -> Self {
        TimeSlot::MIDNIGHT
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeSlot {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SlotError::InvalidTimeSlot(s.to_string());

        let (hh, mm) = s.split_once(':').ok_or_else(invalid)?;
        if hh.len() != 2 || mm.len() != 2 {
            return Err(invalid());
        }
        if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hour: u16 = hh.parse().map_err(|_| invalid())?;
        let minute: u16 = mm.parse().map_err(|_| invalid())?;
        TimeSlot::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// Grid step in minutes. Always positive and a divisor of a full day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct SlotInterval(u16);

impl SlotInterval {
    pub fn new(minutes: u16) -> Result<Self> {
        if minutes == 0 || MINUTES_PER_DAY % minutes != 0 {
            return Err(SlotError::Config(format!(
                "slot interval of {} minutes does not divide a day",
                minutes
            )));
        }
        Ok(SlotInterval(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Whether `slot` falls on this grid, counted from midnight.
    pub fn aligns(self, slot: TimeSlot) -> bool {
        slot.minutes() % self.0 == 0
    }

    /// Reject `slot` unless it falls on this grid.
    ///
    /// # Errors
    /// Returns `SlotError::Config` naming `slot` when it is off this grid.
    pub fn check_aligned(self, slot: TimeSlot) -> Result<()> {
        if !self.aligns(slot) {
            return Err(SlotError::Config(format!(
                "{} is not on the {}-minute grid",
                slot, self.0
            )));
        }
        Ok(())
    }

    /// Number of whole intervals contained in `minutes` (rounded down).
    pub fn whole_steps(self, minutes: u32) -> usize {
        (minutes / u32::from(self.0)) as usize
    }
}

impl Default for SlotInterval {
    fn default() -> Self {
        SlotInterval(DEFAULT_INTERVAL_MINUTES)
    }
}

impl TryFrom<u16> for SlotInterval {
    type Error = SlotError;

    fn try_from(value: u16) -> Result<Self> {
        SlotInterval::new(value)
    }
}

impl From<SlotInterval> for u16 {
    fn from(interval: SlotInterval) -> Self {
        interval.0
    }
}

/// Why a slot on the grid cannot be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisabledReason {
    /// Inside a block window, or the whole day is blocked.
    Blocked,
    /// Capacity is exhausted for the requested party.
    Capacity,
    /// Immediately precedes a slot that just received its first booking.
    AdjacentBooking,
}

/// A grid slot tagged with whether it can be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOption {
    pub slot: TimeSlot,
    /// Whether a reservation may use this slot.
    pub eligible: bool,
    /// Set on ineligible slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DisabledReason>,
}

impl SlotOption {
    pub fn eligible(slot: TimeSlot) -> Self {
        SlotOption {
            slot,
            eligible: true,
            reason: None,
        }
    }

    pub fn disable(&mut self, reason: DisabledReason) {
        self.eligible = false;
        self.reason = Some(reason);
    }

    pub fn enable(&mut self) {
        self.eligible = true;
        self.reason = None;
    }
}

/// Enumerate `opening..=closing` in steps of `interval`.
///
/// The closing boundary is part of the grid (it is a valid end time) but is
/// never offered as a start. The grid has `(closing - opening) / interval + 1`
/// strictly increasing entries.
///
/// # Errors
/// Returns `SlotError::Config` when `opening >= closing` or when the span is
/// not a whole number of intervals.
pub fn enumerate_grid(
    opening: TimeSlot,
    closing: TimeSlot,
    interval: SlotInterval,
) -> Result<Vec<TimeSlot>> {
    if opening >= closing {
        return Err(SlotError::Config(format!(
            "opening {} is not before closing {}",
            opening, closing
        )));
    }
    let span = closing.minutes() - opening.minutes();
    if span % interval.minutes() != 0 {
        return Err(SlotError::Config(format!(
            "{}..{} is not a whole number of {}-minute slots",
            opening,
            closing,
            interval.minutes()
        )));
    }

    let mut grid = Vec::with_capacity(usize::from(span / interval.minutes()) + 1);
    let mut cursor = Some(opening);
    while let Some(slot) = cursor.filter(|s| *s <= closing) {
        grid.push(slot);
        cursor = slot.checked_add(interval);
    }
    Ok(grid)
}

