//! The location snapshot an availability computation consumes.
//!
//! A [`Location`] carries everything configured by the restaurant: operating
//! timezone, grid interval, weekly schedule, special dates, block windows and
//! capacity policy. A [`LocationSnapshot`] adds the bookings known at read
//! time. Both are loaded from JSON and validated up front so that malformed
//! configuration fails before any slot is computed.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::blocks::{block_window_for, BlockWindow};
use crate::error::{Result, SlotError};
use crate::ledger::{CapacityLedger, CapacityPolicy};
use crate::schedule::{resolve_day_schedule, DaySchedule, SpecialDates, WeeklySchedule};
use crate::slot::{SlotInterval, TimeSlot};

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Seated,
    Completed,
    Cancelled,
    Rejected,
    NoShow,
}

impl ReservationStatus {
    /// Whether a reservation in this state holds capacity.
    pub fn is_counted(self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending
                | ReservationStatus::Confirmed
                | ReservationStatus::Seated
                | ReservationStatus::Completed
        )
    }
}

/// A booking as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    /// Owning location. `None` means the location being computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Local calendar date of the booking.
    pub date: NaiveDate,
    pub start_slot: TimeSlot,
    /// Exclusive end. Without one the booking holds only its start slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_slot: Option<TimeSlot>,
    /// Number of guests; what `SEATS_BY_PARTY_SIZE` counts.
    pub party_size: u32,
    /// Only counted statuses hold capacity.
    pub status: ReservationStatus,
}

impl Reservation {
    /// Grid slots held by this reservation: `[start_slot, end_slot)`, or just
    /// the start slot when no end is recorded.
    pub fn occupied_slots(&self, interval: SlotInterval) -> Vec<TimeSlot> {
        let end = match self.end_slot {
            Some(end) if end > self.start_slot => end,
            _ => return vec![self.start_slot],
        };

        let mut slots = Vec::new();
        let mut cursor = Some(self.start_slot);
        while let Some(slot) = cursor.filter(|s| *s < end) {
            slots.push(slot);
            cursor = slot.checked_add(interval);
        }
        slots
    }

    /// Reject start or end times off the `interval` grid. Such a booking
    /// would be keyed at a slot that no lookup ever reaches.
    ///
    /// # Errors
    /// Returns `SlotError::Config` naming the reservation and the time.
    pub fn check_aligned(&self, interval: SlotInterval) -> Result<()> {
        interval
            .check_aligned(self.start_slot)
            .and_then(|()| self.end_slot.map_or(Ok(()), |end| interval.check_aligned(end)))
            .map_err(|e| e.in_context(format!("reservation {}", self.id)))
    }
}

/// IANA timezone in which a location's opening hours are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperatingTimezone(Tz);

impl OperatingTimezone {
    pub fn tz(self) -> Tz {
        self.0
    }
}

impl From<Tz> for OperatingTimezone {
    fn from(tz: Tz) -> Self {
        OperatingTimezone(tz)
    }
}

impl FromStr for OperatingTimezone {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<Tz>()
            .map(OperatingTimezone)
            .map_err(|_| SlotError::InvalidTimezone(s.to_string()))
    }
}

impl TryFrom<String> for OperatingTimezone {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OperatingTimezone> for String {
    fn from(tz: OperatingTimezone) -> Self {
        tz.0.name().to_string()
    }
}

impl fmt::Display for OperatingTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

/// Restaurant configuration relevant to availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    /// Timezone the schedule and "now" are compared in.
    pub timezone: OperatingTimezone,
    /// Grid step; every schedule boundary and booking lies on it.
    #[serde(default, rename = "slot_interval_minutes")]
    pub slot_interval: SlotInterval,
    /// Keyed by Monday-first weekday index.
    pub weekly_schedule: WeeklySchedule,
    /// Overrides that replace the weekly entry for their date.
    #[serde(default)]
    pub special_dates: SpecialDates,
    #[serde(default)]
    pub block_windows: Vec<BlockWindow>,
    pub capacity: CapacityPolicy,
}

impl Location {
    pub fn new(
        id: impl Into<String>,
        timezone: Tz,
        weekly_schedule: WeeklySchedule,
        capacity: CapacityPolicy,
    ) -> Self {
        Location {
            id: id.into(),
            timezone: timezone.into(),
            slot_interval: SlotInterval::default(),
            weekly_schedule,
            special_dates: SpecialDates::new(),
            block_windows: Vec::new(),
            capacity,
        }
    }

    pub fn with_interval(mut self, interval: SlotInterval) -> Self {
        self.slot_interval = interval;
        self
    }

    pub fn with_special_date(mut self, date: NaiveDate, schedule: DaySchedule) -> Self {
        self.special_dates.insert(date, schedule);
        self
    }

    pub fn with_block_window(mut self, window: BlockWindow) -> Self {
        self.block_windows.push(window);
        self
    }

    /// Check schedule, special-date and block-window invariants. Open days
    /// must open and close on the slot grid.
    ///
    /// # Errors
    /// Returns `SlotError::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.capacity.limit == 0 {
            return Err(SlotError::Config(format!(
                "location {} has a capacity limit of zero",
                self.id
            )));
        }
        self.weekly_schedule.validate(self.slot_interval)?;
        for (date, schedule) in &self.special_dates {
            schedule
                .validate_on(self.slot_interval)
                .map_err(|e| e.in_context(format!("special date {}", date)))?;
        }
        for window in &self.block_windows {
            window.validate()?;
        }
        Ok(())
    }

    pub fn day_schedule(&self, date: NaiveDate) -> Result<DaySchedule> {
        resolve_day_schedule(&self.weekly_schedule, &self.special_dates, date)
    }

    pub fn block_window(&self, date: NaiveDate) -> Option<BlockWindow> {
        block_window_for(&self.block_windows, date)
    }

    /// Whether `reservation` belongs to this location. Reservations without a
    /// location id are assumed local.
    pub fn owns(&self, reservation: &Reservation) -> bool {
        reservation
            .location_id
            .as_deref()
            .is_none_or(|id| id == self.id)
    }
}

/// A location together with the bookings known when it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub location: Location,
    /// Bookings as stored. Foreign or uncounted ones are skipped by [`ledger`](Self::ledger).
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    /// Precomputed occupancy, merged with the one derived from `reservations`.
    #[serde(default)]
    pub occupancy: CapacityLedger,
}

impl LocationSnapshot {
    pub fn new(location: Location) -> Self {
        LocationSnapshot {
            location,
            reservations: Vec::new(),
            occupancy: CapacityLedger::new(),
        }
    }

    pub fn with_reservation(mut self, reservation: Reservation) -> Self {
        self.reservations.push(reservation);
        self
    }

    /// Parse and validate a snapshot from JSON.
    ///
    /// # Errors
    /// Returns `SlotError::Json` for malformed documents (including malformed
    /// slot, date or timezone values) and `SlotError::Config` for schedule
    /// invariants or bookings off the slot grid.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: LocationSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Validate the location, then check that every local booking and every
    /// precomputed occupancy key lies on the location's slot grid.
    pub fn validate(&self) -> Result<()> {
        self.location.validate()?;
        let interval = self.location.slot_interval;
        for reservation in self.reservations.iter().filter(|r| self.location.owns(r)) {
            reservation.check_aligned(interval)?;
        }
        self.occupancy.check_aligned(interval)
    }

    /// Occupancy ledger for this snapshot: the precomputed occupancy plus every
    /// counted reservation belonging to the location.
    pub fn ledger(&self) -> CapacityLedger {
        let mut ledger = CapacityLedger::from_reservations(
            self.reservations
                .iter()
                .filter(|r| self.location.owns(r)),
            self.location.slot_interval,
        );
        ledger.merge(&self.occupancy);
        ledger
    }

    pub fn find_reservation(&self, id: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }
}
