//! Start-slot availability for a date and party size.
//!
//! Merges the layers that decide whether a reservation may start at a slot,
//! in a fixed order:
//!
//! 1. the day's schedule (weekly entry or special-date override),
//! 2. the slot grid between opening and closing,
//! 3. block windows,
//! 4. release of the reservation being edited,
//! 5. capacity per slot, under the location's counting mode,
//! 6. the adjacent-booking rule (aggregate-count locations only),
//! 7. re-enabling the edited reservation's own start,
//! 8. the closing buffer,
//! 9. the preview window.
//!
//! The result is advisory. Two callers reading the same snapshot can both be
//! told a slot is free; the commit path must re-check capacity atomically
//! (see [`CapacityLedger::try_admit`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::blocks::apply_blocks;
use crate::error::{Result, SlotError};
use crate::ledger::{CapacityLedger, CapacityMode, LedgerView, Occupancy};
use crate::location::{Location, Reservation};
use crate::preview::PreviewWindowPolicy;
use crate::slot::{enumerate_grid, DisabledReason, SlotOption, TimeSlot};

/// Why a computation produced no eligible slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmptyReason {
    /// The location does not take reservations on this date.
    Closed,
    /// Slots exist but capacity rules out every one of them.
    FullyBooked,
    /// Every remaining slot is already in the past.
    NoFutureSlots,
}

/// Parameters of one availability computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    /// Local calendar date in the location's timezone.
    pub date: NaiveDate,
    /// Guests in the party; must be at least 1.
    pub party_size: u32,
    /// The reservation being edited, if any. It never blocks itself.
    #[serde(default)]
    pub editing: Option<Reservation>,
    /// The instant the computation is made at.
    pub now: DateTime<Utc>,
    /// Privileged lookback, in hours, honoured only while editing.
    #[serde(default)]
    pub lookback_hours: Option<u32>,
}

impl AvailabilityRequest {
    pub fn new(date: NaiveDate, party_size: u32, now: DateTime<Utc>) -> Self {
        AvailabilityRequest {
            date,
            party_size,
            editing: None,
            now,
            lookback_hours: None,
        }
    }

    pub fn editing(mut self, reservation: Reservation) -> Self {
        self.editing = Some(reservation);
        self
    }

    pub fn with_lookback(mut self, hours: u32) -> Self {
        self.lookback_hours = Some(hours);
        self
    }

    /// The edited reservation, when it belongs to this date and location.
    pub(crate) fn editing_for(&self, location: &Location) -> Option<&Reservation> {
        self.editing
            .as_ref()
            .filter(|r| r.date == self.date && location.owns(r))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.party_size == 0 {
            return Err(SlotError::InvalidRequest(
                "party size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ordered start options for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub date: NaiveDate,
    /// Start options in grid order, ineligible ones tagged with a reason.
    pub slots: Vec<SlotOption>,
    /// Set when no slot is eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

impl Availability {
    fn closed(date: NaiveDate) -> Self {
        Availability {
            date,
            slots: Vec::new(),
            reason: Some(EmptyReason::Closed),
        }
    }

    /// Eligible start slots, in order.
    pub fn eligible_slots(&self) -> Vec<TimeSlot> {
        self.slots
            .iter()
            .filter(|o| o.eligible)
            .map(|o| o.slot)
            .collect()
    }

    pub fn is_eligible(&self, slot: TimeSlot) -> bool {
        self.slots.iter().any(|o| o.slot == slot && o.eligible)
    }

    pub fn has_eligible(&self) -> bool {
        self.slots.iter().any(|o| o.eligible)
    }
}

/// Compute the start slots a new or edited reservation may take on
/// `request.date`.
///
/// # Errors
/// - `SlotError::Config` when the schedule is malformed (no weekly entry for
///   the weekday, opening not before closing, misaligned grid).
/// - `SlotError::EditConflict` when the edited reservation no longer matches
///   the ledger.
/// - `SlotError::InvalidRequest` for a party size of zero.
pub fn compute_start_slots(
    location: &Location,
    ledger: &CapacityLedger,
    request: &AvailabilityRequest,
) -> Result<Availability> {
    request.validate()?;
    let date = request.date;
    let interval = location.slot_interval;
    let policy = &location.capacity;

    let schedule = location.day_schedule(date)?;
    if !schedule.is_open {
        tracing::debug!(%date, location = %location.id, "closed by schedule");
        return Ok(Availability::closed(date));
    }

    let grid = enumerate_grid(schedule.opening, schedule.closing, interval)?;
    let mut options: Vec<SlotOption> = grid.iter().copied().map(SlotOption::eligible).collect();

    let block = location.block_window(date);
    if let Some(window) = &block {
        options = apply_blocks(options, window);
    }

    let editing = request.editing_for(location);
    let mut view = ledger.view();
    let released = match editing {
        Some(reservation) => view.release_for_edit(reservation)?,
        None => false,
    };

    // The closing boundary is an end time, never a start.
    options.pop();

    for option in options.iter_mut().filter(|o| o.eligible) {
        let occupancy = view.occupancy_at(date, option.slot);
        if !policy.admits(occupancy, request.party_size) {
            option.disable(DisabledReason::Capacity);
        }
    }

    if policy.mode == CapacityMode::AggregateCount {
        apply_adjacent_booking_rule(&mut options, &grid, &view, date);
    }

    if let Some(reservation) = editing {
        if let Some(own) = options
            .iter_mut()
            .find(|o| o.slot == reservation.start_slot && o.reason != Some(DisabledReason::Blocked))
        {
            own.enable();
        }
    }

    let buffer_slots = interval.whole_steps(policy.buffer_minutes);
    options.truncate(options.len().saturating_sub(buffer_slots));
    let before_preview = options.len();

    let lookback = match (editing, request.lookback_hours) {
        (Some(_), Some(hours)) => hours,
        (None, Some(_)) => {
            tracing::debug!(%date, "lookback ignored outside an edit flow");
            0
        }
        _ => 0,
    };
    let preview = PreviewWindowPolicy::with_lookback(location.timezone.tz(), request.now, lookback);
    let options = preview.trim(date, options);

    if let Some(reservation) = editing.filter(|_| released) {
        view.restore(&reservation.id);
    }

    let reason = if options.iter().any(|o| o.eligible) {
        None
    } else if block.as_ref().is_some_and(|w| w.day_closed) || before_preview == 0 {
        Some(EmptyReason::Closed)
    } else if options.is_empty() {
        Some(EmptyReason::NoFutureSlots)
    } else if options
        .iter()
        .all(|o| o.reason == Some(DisabledReason::Blocked))
    {
        Some(EmptyReason::Closed)
    } else {
        Some(EmptyReason::FullyBooked)
    };

    tracing::debug!(
        %date,
        location = %location.id,
        party_size = request.party_size,
        offered = options.len(),
        eligible = options.iter().filter(|o| o.eligible).count(),
        ?reason,
        "computed start slots"
    );

    Ok(Availability {
        date,
        slots: options,
        reason,
    })
}

/// Disable the slot right before one whose reservation count goes from zero
/// to non-zero, when that earlier slot was otherwise eligible.
///
/// `grid` is the full day grid including the closing boundary; `options`
/// covers its prefix.
fn apply_adjacent_booking_rule(
    options: &mut [SlotOption],
    grid: &[TimeSlot],
    view: &LedgerView<'_>,
    date: NaiveDate,
) {
    let counts: Vec<Occupancy> = grid.iter().map(|s| view.occupancy_at(date, *s)).collect();

    for i in 1..counts.len() {
        let first_booking = counts[i - 1].reservation_count == 0 && counts[i].reservation_count > 0;
        if !first_booking {
            continue;
        }
        if let Some(previous) = options.get_mut(i - 1).filter(|o| o.eligible) {
            tracing::trace!(slot = %previous.slot, next = %grid[i], "adjacent booking disables slot");
            previous.disable(DisabledReason::AdjacentBooking);
        }
    }
}
