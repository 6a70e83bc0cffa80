//! End-time options for a chosen start slot.
//!
//! Valid ends form one contiguous run right after the start: the walk stops
//! at the first slot that fails the capacity predicate (or is blocked), and
//! nothing after it is offered. The adjacent-booking rule does not apply
//! here; it only constrains where a reservation may start.

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityRequest;
use crate::error::{Result, SlotError};
use crate::ledger::CapacityLedger;
use crate::location::Location;
use crate::slot::{enumerate_grid, SlotOption, TimeSlot};

/// Ordered end options for a start slot. Empty means the start has no legal
/// duration and another start must be chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSlots {
    pub start: TimeSlot,
    /// Every entry is eligible; the run stops at the first slot that is not.
    pub slots: Vec<SlotOption>,
}

impl EndSlots {
    pub fn end_times(&self) -> Vec<TimeSlot> {
        self.slots.iter().map(|o| o.slot).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Compute the end slots a reservation starting at `start` may take.
///
/// Uses `request.date`, `request.party_size` and `request.editing`; the
/// preview fields are irrelevant because every end follows the start.
///
/// # Errors
/// - `SlotError::SlotOffGrid` when `start` is not a start slot of the day's
///   grid (the closing boundary included).
/// - `SlotError::Config` for a malformed schedule.
/// - `SlotError::EditConflict` when the edited reservation no longer matches
///   the ledger.
pub fn compute_end_slots(
    location: &Location,
    ledger: &CapacityLedger,
    request: &AvailabilityRequest,
    start: TimeSlot,
) -> Result<EndSlots> {
    request.validate()?;
    let date = request.date;
    let interval = location.slot_interval;
    let policy = &location.capacity;

    let schedule = location.day_schedule(date)?;
    if !schedule.is_open {
        return Ok(EndSlots {
            start,
            slots: Vec::new(),
        });
    }

    let grid = enumerate_grid(schedule.opening, schedule.closing, interval)?;
    let start_index = grid
        .iter()
        .position(|s| *s == start)
        .filter(|i| i + 1 < grid.len())
        .ok_or(SlotError::SlotOffGrid(start))?;

    let block = location.block_window(date);
    let editing = request.editing_for(location);
    let mut view = ledger.view();
    let released = match editing {
        Some(reservation) => view.release_for_edit(reservation)?,
        None => false,
    };

    // The last `buffer_slots` grid entries, closing included, are not valid ends.
    let buffer_slots = interval.whole_steps(policy.buffer_minutes);
    let last_end = grid.len().saturating_sub(buffer_slots + 1);

    let mut ends = Vec::new();
    for (index, slot) in grid.iter().enumerate().skip(start_index + 1) {
        let blocked = block.as_ref().is_some_and(|w| w.blocks(*slot));
        if blocked || !policy.admits(view.occupancy_at(date, *slot), request.party_size) {
            tracing::trace!(%date, %slot, blocked, "end walk stopped");
            break;
        }
        if index > last_end {
            break;
        }
        ends.push(SlotOption::eligible(*slot));
    }

    if let Some(reservation) = editing.filter(|_| released) {
        view.restore(&reservation.id);
    }

    tracing::debug!(%date, %start, ends = ends.len(), "computed end slots");

    Ok(EndSlots { start, slots: ends })
}
