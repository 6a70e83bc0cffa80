//! # slot-engine
//!
//! Reservation time-slot availability for restaurant bookings.
//!
//! Given a location's weekly schedule, special dates, block windows, capacity
//! policy and current bookings, the engine computes which start times (and,
//! for a chosen start, which end times) a new or edited reservation may take
//! without exceeding capacity. Every computation is a pure pass over a
//! snapshot; nothing is persisted.
//!
//! ## Modules
//!
//! - [`slot`] — `TimeSlot`, `SlotInterval` and grid enumeration
//! - [`schedule`] — weekly schedule, special dates, weekday homologation
//! - [`blocks`] — block windows subtracted from the grid
//! - [`ledger`] — capacity policy, occupancy ledger and edit overlay
//! - [`preview`] — trims slots before "now" in the location timezone
//! - [`availability`] — start-slot computation
//! - [`end_hours`] — end-slot computation for a chosen start
//! - [`location`] — location configuration, reservations, JSON snapshots
//! - [`error`] — Error types

pub mod availability;
pub mod blocks;
pub mod end_hours;
pub mod error;
pub mod ledger;
pub mod location;
pub mod preview;
pub mod schedule;
pub mod slot;

pub use availability::{compute_start_slots, Availability, AvailabilityRequest, EmptyReason};
pub use blocks::{apply_blocks, BlockRange, BlockWindow};
pub use end_hours::{compute_end_slots, EndSlots};
pub use error::SlotError;
pub use ledger::{CapacityLedger, CapacityMode, CapacityPolicy, LedgerView, Occupancy};
pub use location::{Location, LocationSnapshot, Reservation, ReservationStatus};
pub use preview::PreviewWindowPolicy;
pub use schedule::{homologate_weekday, resolve_day_schedule, DaySchedule, WeeklySchedule};
pub use slot::{enumerate_grid, DisabledReason, SlotInterval, SlotOption, TimeSlot};
