//! Property-based tests for availability using proptest.
//!
//! These check invariants that must hold for any schedule, occupancy and
//! party size, not just the hand-picked cases in `availability_tests.rs`.

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use slot_engine::schedule::{DaySchedule, WeeklySchedule};
use slot_engine::slot::MINUTES_PER_DAY;
use slot_engine::{
    compute_end_slots, compute_start_slots, enumerate_grid, AvailabilityRequest, CapacityLedger,
    CapacityMode, CapacityPolicy, Location, Reservation, ReservationStatus, SlotInterval, TimeSlot,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_interval() -> impl Strategy<Value = SlotInterval> {
    prop_oneof![Just(15u16), Just(30u16), Just(60u16)]
        .prop_map(|m| SlotInterval::new(m).unwrap())
}

/// Opening hour and number of slots until closing.
fn arb_hours() -> impl Strategy<Value = (u16, u16)> {
    (6u16..=16, 1u16..=16)
}

fn arb_policy() -> impl Strategy<Value = CapacityPolicy> {
    (
        prop_oneof![Just(CapacityMode::AggregateCount), Just(CapacityMode::SeatsByPartySize)],
        1u32..=12,
        0u32..=120,
    )
        .prop_map(|(mode, limit, buffer_minutes)| CapacityPolicy {
            mode,
            limit,
            buffer_minutes,
        })
}

/// Bookings as (slot offset from opening, optional length in slots, party size).
fn arb_bookings() -> impl Strategy<Value = Vec<(u16, Option<u16>, u32)>> {
    prop::collection::vec((0u16..16, prop::option::of(1u16..4), 1u32..=8), 0..12)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
}

struct Case {
    location: Location,
    ledger: CapacityLedger,
    reservations: Vec<Reservation>,
    opening: TimeSlot,
    closing: TimeSlot,
    steps: u16,
}

fn build_case(
    interval: SlotInterval,
    (open_hour, steps): (u16, u16),
    policy: CapacityPolicy,
    bookings: &[(u16, Option<u16>, u32)],
) -> Case {
    let step = interval.minutes();
    let opening = TimeSlot::new(open_hour, 0).unwrap();
    let steps = steps.min((MINUTES_PER_DAY - opening.minutes()) / step);
    let closing = TimeSlot::from_minutes(opening.minutes() + steps * step).unwrap();
    let weekly = (0..7).fold(WeeklySchedule::new(), |w, d| {
        w.with_day(d, DaySchedule::open(opening, closing))
    });
    let location = Location::new("prop", Tz::UTC, weekly, policy).with_interval(interval);

    let reservations: Vec<Reservation> = bookings
        .iter()
        .enumerate()
        .filter(|(_, (offset, _, _))| *offset < steps)
        .map(|(i, (offset, len, party))| {
            let start = TimeSlot::from_minutes(opening.minutes() + offset * step).unwrap();
            let end = len.map(|l| {
                TimeSlot::from_minutes((start.minutes() + l * step).min(closing.minutes())).unwrap()
            });
            Reservation {
                id: format!("r{i}"),
                location_id: None,
                date: day(),
                start_slot: start,
                end_slot: end,
                party_size: *party,
                status: ReservationStatus::Confirmed,
            }
        })
        .collect();
    let ledger = CapacityLedger::from_reservations(&reservations, interval);

    Case {
        location,
        ledger,
        reservations,
        opening,
        closing,
        steps,
    }
}

fn request(party: u32) -> AvailabilityRequest {
    AvailabilityRequest::new(day(), party, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn grid_length_and_order(interval in arb_interval(), hours in arb_hours()) {
        let case = build_case(interval, hours, CapacityPolicy::aggregate(1), &[]);
        let grid = enumerate_grid(case.opening, case.closing, interval).unwrap();

        let span = case.closing.minutes() - case.opening.minutes();
        prop_assert_eq!(grid.len(), usize::from(span / interval.minutes()) + 1);
        prop_assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn closing_is_never_a_start(
        interval in arb_interval(),
        hours in arb_hours(),
        policy in arb_policy(),
        bookings in arb_bookings(),
        party in 1u32..=6,
    ) {
        let case = build_case(interval, hours, policy, &bookings);
        let result = compute_start_slots(&case.location, &case.ledger, &request(party)).unwrap();
        prop_assert!(result.slots.iter().all(|o| o.slot < case.closing));
    }

    #[test]
    fn identical_inputs_identical_output(
        interval in arb_interval(),
        hours in arb_hours(),
        policy in arb_policy(),
        bookings in arb_bookings(),
        party in 1u32..=6,
    ) {
        let case = build_case(interval, hours, policy, &bookings);
        let a = compute_start_slots(&case.location, &case.ledger, &request(party)).unwrap();
        let b = compute_start_slots(&case.location, &case.ledger, &request(party)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn seats_never_exceeded(
        interval in arb_interval(),
        hours in arb_hours(),
        limit in 1u32..=12,
        bookings in arb_bookings(),
        party in 1u32..=6,
    ) {
        let case = build_case(interval, hours, CapacityPolicy::seats(limit), &bookings);
        let result = compute_start_slots(&case.location, &case.ledger, &request(party)).unwrap();

        for slot in result.eligible_slots() {
            let occupancy = case.ledger.occupancy_at(day(), slot);
            prop_assert!(occupancy.people_count + party <= limit);
        }
    }

    #[test]
    fn release_restore_symmetry(
        interval in arb_interval(),
        hours in arb_hours(),
        bookings in arb_bookings(),
        pick in any::<prop::sample::Index>(),
    ) {
        let case = build_case(interval, hours, CapacityPolicy::aggregate(1), &bookings);
        prop_assume!(!case.reservations.is_empty());
        let target = &case.reservations[pick.index(case.reservations.len())];
        let grid = enumerate_grid(case.opening, case.closing, interval).unwrap();

        let mut view = case.ledger.view();
        view.release(&target.id);
        view.restore(&target.id);

        for slot in grid {
            prop_assert_eq!(view.occupancy_at(day(), slot), case.ledger.occupancy_at(day(), slot));
        }
    }

    #[test]
    fn buffer_of_two_intervals_hides_last_two_starts(
        interval in arb_interval(),
        hours in (6u16..=16, 3u16..=16),
    ) {
        let buffer = 2 * u32::from(interval.minutes());
        let policy = CapacityPolicy::aggregate(5).with_buffer(buffer);
        let case = build_case(interval, hours, policy, &[]);
        let result = compute_start_slots(&case.location, &case.ledger, &request(2)).unwrap();

        let last_two: Vec<TimeSlot> = (1..=2)
            .map(|k| TimeSlot::from_minutes(case.closing.minutes() - k * interval.minutes()).unwrap())
            .collect();
        prop_assert!(result.slots.iter().all(|o| !last_two.contains(&o.slot)));
        prop_assert_eq!(result.slots.len(), usize::from(case.steps) - 2);
    }

    #[test]
    fn no_past_slot_without_lookback(
        interval in arb_interval(),
        hours in arb_hours(),
        now_minutes in 0u32..(24 * 60),
    ) {
        let case = build_case(interval, hours, CapacityPolicy::aggregate(5), &[]);
        let now = Utc.from_utc_datetime(&day().and_hms_opt(0, 0, 0).unwrap())
            + chrono::Duration::minutes(i64::from(now_minutes));
        let req = AvailabilityRequest::new(day(), 2, now);
        let result = compute_start_slots(&case.location, &case.ledger, &req).unwrap();

        for option in &result.slots {
            prop_assert!(option.slot.on_date(day()) >= now.naive_utc());
        }
    }

    #[test]
    fn end_slots_are_one_contiguous_run(
        interval in arb_interval(),
        hours in arb_hours(),
        policy in arb_policy(),
        bookings in arb_bookings(),
        party in 1u32..=6,
    ) {
        let case = build_case(interval, hours, policy, &bookings);
        let ends = compute_end_slots(&case.location, &case.ledger, &request(party), case.opening).unwrap();

        let mut expected = case.opening;
        for end in ends.end_times() {
            expected = expected.checked_add(interval).unwrap();
            prop_assert_eq!(end, expected);
        }
    }
}
