//! Drop start slots that are already in the past.
//!
//! "Now" is always an explicit instant, converted into the location's
//! operating timezone before comparing against slot wall-clock times. A
//! privileged lookback widens the window by a number of hours so that staff
//! editing a reservation can still see slots that began shortly before now.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::slot::SlotOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewWindowPolicy {
    pub timezone: Tz,
    pub now: DateTime<Utc>,
    pub lookback_hours: u32,
}

impl PreviewWindowPolicy {
    /// Policy with no lookback: nothing before `now` survives.
    pub fn strict(timezone: Tz, now: DateTime<Utc>) -> Self {
        PreviewWindowPolicy {
            timezone,
            now,
            lookback_hours: 0,
        }
    }

    pub fn with_lookback(timezone: Tz, now: DateTime<Utc>, lookback_hours: u32) -> Self {
        PreviewWindowPolicy {
            timezone,
            now,
            lookback_hours,
        }
    }

    /// Earliest local wall-clock time a slot may start at.
    pub fn cutoff(&self) -> NaiveDateTime {
        let local_now = self.now.with_timezone(&self.timezone).naive_local();
        local_now - Duration::hours(i64::from(self.lookback_hours))
    }

    /// Keep only options starting at or after the cutoff, preserving order.
    pub fn trim(&self, date: NaiveDate, options: Vec<SlotOption>) -> Vec<SlotOption> {
        let cutoff = self.cutoff();
        options
            .into_iter()
            .filter(|o| o.slot.on_date(date) >= cutoff)
            .collect()
    }
}
