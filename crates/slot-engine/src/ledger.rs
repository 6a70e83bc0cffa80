//! Per-date, per-slot occupancy accounting.
//!
//! [`CapacityLedger`] holds which reservations occupy which slots. Reads for a
//! single computation go through a [`LedgerView`], a copy-on-write overlay that
//! can release the reservation being edited without touching the ledger
//! itself, so concurrent computations over the same ledger never observe each
//! other's releases.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::location::Reservation;
use crate::slot::{SlotInterval, TimeSlot};

/// How a location counts capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityMode {
    /// At most `limit` concurrent reservations per slot, whatever their size.
    AggregateCount,
    /// At most `limit` people per slot.
    SeatsByPartySize,
}

/// Capacity rules for a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    pub mode: CapacityMode,
    /// Reservations per slot or people per slot, depending on `mode`.
    pub limit: u32,
    /// Minimum time before closing during which no reservation may start.
    #[serde(default)]
    pub buffer_minutes: u32,
}

impl CapacityPolicy {
    pub fn aggregate(limit: u32) -> Self {
        CapacityPolicy {
            mode: CapacityMode::AggregateCount,
            limit,
            buffer_minutes: 0,
        }
    }

    pub fn seats(limit: u32) -> Self {
        CapacityPolicy {
            mode: CapacityMode::SeatsByPartySize,
            limit,
            buffer_minutes: 0,
        }
    }

    pub fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }

    /// Whether a party of `party_size` fits on top of `occupancy`.
    pub fn admits(&self, occupancy: Occupancy, party_size: u32) -> bool {
        match self.mode {
            CapacityMode::SeatsByPartySize => {
                occupancy.people_count.saturating_add(party_size) <= self.limit
            }
            CapacityMode::AggregateCount => occupancy.reservation_count < self.limit,
        }
    }
}

/// One reservation's share of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub reservation_id: String,
    /// Guests this occupant seats in the slot.
    pub party_size: u32,
}

/// Aggregated counts for one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    /// Distinct reservations holding the slot.
    pub reservation_count: u32,
    /// Sum of their party sizes.
    pub people_count: u32,
}

impl Occupancy {
    fn add(&mut self, occupant: &Occupant) {
        self.reservation_count += 1;
        self.people_count = self.people_count.saturating_add(occupant.party_size);
    }
}

/// date → slot → occupants.
pub type ReservationOccupancy = BTreeMap<NaiveDate, BTreeMap<TimeSlot, Vec<Occupant>>>;

/// Occupancy snapshot for a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityLedger {
    entries: ReservationOccupancy,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_occupancy(entries: ReservationOccupancy) -> Self {
        CapacityLedger { entries }
    }

    /// Build a ledger from every reservation in a counted status.
    pub fn from_reservations<'a, I>(reservations: I, interval: SlotInterval) -> Self
    where
        I: IntoIterator<Item = &'a Reservation>,
    {
        let mut ledger = CapacityLedger::new();
        for reservation in reservations {
            ledger.admit(reservation, interval);
        }
        ledger
    }

    /// Reject any recorded slot off the `interval` grid.
    ///
    /// # Errors
    /// Returns `SlotError::Config` naming the first misaligned date and slot.
    pub fn check_aligned(&self, interval: SlotInterval) -> Result<()> {
        for (date, slots) in &self.entries {
            for slot in slots.keys() {
                interval
                    .check_aligned(*slot)
                    .map_err(|e| e.in_context(format!("occupancy on {}", date)))?;
            }
        }
        Ok(())
    }

    /// Fold another snapshot into this one. Occupants already recorded for a
    /// slot are not duplicated.
    pub fn merge(&mut self, other: &CapacityLedger) {
        for (date, slots) in &other.entries {
            for (slot, occupants) in slots {
                let target = self
                    .entries
                    .entry(*date)
                    .or_default()
                    .entry(*slot)
                    .or_default();
                for occupant in occupants {
                    if !target
                        .iter()
                        .any(|o| o.reservation_id == occupant.reservation_id)
                    {
                        target.push(occupant.clone());
                    }
                }
            }
        }
    }

    /// Record a reservation in every slot it occupies.
    ///
    /// Returns `false` without recording anything when the reservation's
    /// status does not count against capacity.
    pub fn admit(&mut self, reservation: &Reservation, interval: SlotInterval) -> bool {
        if !reservation.status.is_counted() {
            return false;
        }
        let day = self.entries.entry(reservation.date).or_default();
        for slot in reservation.occupied_slots(interval) {
            let occupants = day.entry(slot).or_default();
            occupants.retain(|o| o.reservation_id != reservation.id);
            occupants.push(Occupant {
                reservation_id: reservation.id.clone(),
                party_size: reservation.party_size,
            });
        }
        true
    }

    /// Remove a reservation from every slot of every date. Returns whether
    /// anything was removed.
    pub fn cancel(&mut self, reservation_id: &str) -> bool {
        let mut removed = false;
        for slots in self.entries.values_mut() {
            for occupants in slots.values_mut() {
                let before = occupants.len();
                occupants.retain(|o| o.reservation_id != reservation_id);
                removed |= occupants.len() != before;
            }
            slots.retain(|_, occupants| !occupants.is_empty());
        }
        self.entries.retain(|_, slots| !slots.is_empty());
        removed
    }

    pub fn occupancy_at(&self, date: NaiveDate, slot: TimeSlot) -> Occupancy {
        self.occupancy_excluding(date, slot, &BTreeSet::new())
    }

    /// Slots on `date` where `reservation_id` is recorded, in order.
    pub fn slots_of(&self, date: NaiveDate, reservation_id: &str) -> Vec<TimeSlot> {
        self.entries
            .get(&date)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|(_, occupants)| {
                        occupants.iter().any(|o| o.reservation_id == reservation_id)
                    })
                    .map(|(slot, _)| *slot)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn occupants(&self, date: NaiveDate, slot: TimeSlot) -> &[Occupant] {
        self.entries
            .get(&date)
            .and_then(|slots| slots.get(&slot))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A fresh overlay with nothing released.
    pub fn view(&self) -> LedgerView<'_> {
        LedgerView {
            ledger: self,
            released: BTreeSet::new(),
        }
    }

    /// Admit `reservation` only if every slot it occupies still has room.
    ///
    /// This is the check-and-increment a storage layer must perform
    /// atomically at commit time; `&mut self` makes it exclusive here. A
    /// reservation already in the ledger is treated as an edit: its own
    /// previous occupancy does not count against it.
    ///
    /// # Errors
    /// - `SlotError::Config` when the reservation lies off the `interval` grid.
    /// - `SlotError::CommitRaceRejected` naming the first full slot.
    pub fn try_admit(
        &mut self,
        reservation: &Reservation,
        policy: &CapacityPolicy,
        interval: SlotInterval,
    ) -> Result<()> {
        if !reservation.status.is_counted() {
            return Ok(());
        }
        reservation.check_aligned(interval)?;

        let full_slot = {
            let mut view = self.view();
            view.release(&reservation.id);
            reservation
                .occupied_slots(interval)
                .into_iter()
                .find(|slot| {
                    !policy.admits(
                        view.occupancy_at(reservation.date, *slot),
                        reservation.party_size,
                    )
                })
        };

        if let Some(slot) = full_slot {
            tracing::debug!(
                reservation_id = %reservation.id,
                date = %reservation.date,
                %slot,
                "conditional admit rejected"
            );
            return Err(SlotError::CommitRaceRejected {
                reservation_id: reservation.id.clone(),
                date: reservation.date,
                slot,
            });
        }

        self.cancel(&reservation.id);
        self.admit(reservation, interval);
        Ok(())
    }

    fn occupancy_excluding(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
        released: &BTreeSet<String>,
    ) -> Occupancy {
        let mut occupancy = Occupancy::default();
        for occupant in self
            .occupants(date, slot)
            .iter()
            .filter(|o| !released.contains(&o.reservation_id))
        {
            occupancy.add(occupant);
        }
        occupancy
    }
}

/// Read-only view over a [`CapacityLedger`] with a local set of released
/// reservations.
///
/// The view owns its overlay; dropping it discards every release.
#[derive(Debug, Clone)]
pub struct LedgerView<'a> {
    ledger: &'a CapacityLedger,
    released: BTreeSet<String>,
}

impl<'a> LedgerView<'a> {
    pub fn ledger(&self) -> &'a CapacityLedger {
        self.ledger
    }

    pub fn occupancy_at(&self, date: NaiveDate, slot: TimeSlot) -> Occupancy {
        self.ledger.occupancy_excluding(date, slot, &self.released)
    }

    /// Stop counting `reservation_id`. Returns `false` if it was already released.
    pub fn release(&mut self, reservation_id: &str) -> bool {
        let newly = self.released.insert(reservation_id.to_string());
        if newly {
            tracing::trace!(reservation_id, "released from ledger view");
        }
        newly
    }

    /// Count `reservation_id` again. Returns `false` if it was not released.
    pub fn restore(&mut self, reservation_id: &str) -> bool {
        let was = self.released.remove(reservation_id);
        if was {
            tracing::trace!(reservation_id, "restored to ledger view");
        }
        was
    }

    pub fn is_released(&self, reservation_id: &str) -> bool {
        self.released.contains(reservation_id)
    }

    /// Release the reservation being edited after checking it still matches
    /// the ledger.
    ///
    /// Reservations in a status that does not count against capacity occupy
    /// nothing and are not released (`Ok(false)`).
    ///
    /// # Errors
    /// Returns `SlotError::EditConflict` when a counted reservation is missing
    /// from the ledger for its date, or is recorded away from its start slot.
    pub fn release_for_edit(&mut self, reservation: &Reservation) -> Result<bool> {
        if !reservation.status.is_counted() {
            return Ok(false);
        }

        let recorded = self.ledger.slots_of(reservation.date, &reservation.id);
        if recorded.is_empty() {
            return Err(SlotError::EditConflict {
                reservation_id: reservation.id.clone(),
                reason: format!("not present in the ledger for {}", reservation.date),
            });
        }
        if !recorded.contains(&reservation.start_slot) {
            return Err(SlotError::EditConflict {
                reservation_id: reservation.id.clone(),
                reason: format!(
                    "ledger records it from {} rather than {}",
                    recorded[0], reservation.start_slot
                ),
            });
        }

        Ok(self.release(&reservation.id))
    }
}
