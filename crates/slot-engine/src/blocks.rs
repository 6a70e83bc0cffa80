//! Explicitly blocked windows that close parts of a day regardless of the
//! schedule.
//!
//! Ranges are half-open `[from, to)` and may overlap; the union is applied.
//! A window flagged `day_closed` blocks every slot of its date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::slot::{DisabledReason, SlotOption, TimeSlot};

/// A half-open blocked range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: TimeSlot,
    pub to: TimeSlot,
}

impl BlockRange {
    pub fn new(from: TimeSlot, to: TimeSlot) -> Self {
        BlockRange { from, to }
    }

    pub fn contains(&self, slot: TimeSlot) -> bool {
        self.from <= slot && slot < self.to
    }
}

/// Date-scoped closures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    pub date: NaiveDate,
    /// Blocked ranges; overlaps are fine.
    #[serde(default)]
    pub ranges: Vec<BlockRange>,
    /// Blocks every slot of the date.
    #[serde(default)]
    pub day_closed: bool,
}

impl BlockWindow {
    pub fn new(date: NaiveDate) -> Self {
        BlockWindow {
            date,
            ranges: Vec::new(),
            day_closed: false,
        }
    }

    pub fn with_range(mut self, from: TimeSlot, to: TimeSlot) -> Self {
        self.ranges.push(BlockRange::new(from, to));
        self
    }

    pub fn closed_all_day(mut self) -> Self {
        self.day_closed = true;
        self
    }

    pub fn blocks(&self, slot: TimeSlot) -> bool {
        self.day_closed || self.ranges.iter().any(|r| r.contains(slot))
    }

    /// Every range must end after it starts.
    pub fn validate(&self) -> Result<()> {
        for range in &self.ranges {
            if range.to <= range.from {
                return Err(SlotError::Config(format!(
                    "block window on {} has empty range {}..{}",
                    self.date, range.from, range.to
                )));
            }
        }
        Ok(())
    }
}

/// Collect every window configured for `date` into one.
///
/// Returns `None` when nothing blocks the date.
pub fn block_window_for(windows: &[BlockWindow], date: NaiveDate) -> Option<BlockWindow> {
    windows
        .iter()
        .filter(|w| w.date == date)
        .fold(None, |merged: Option<BlockWindow>, w| {
            let mut acc = merged.unwrap_or_else(|| BlockWindow::new(date));
            acc.ranges.extend_from_slice(&w.ranges);
            acc.day_closed |= w.day_closed;
            Some(acc)
        })
}

/// Flag every grid slot covered by `window` as blocked.
pub fn apply_blocks(mut grid: Vec<SlotOption>, window: &BlockWindow) -> Vec<SlotOption> {
    for option in grid.iter_mut().filter(|o| window.blocks(o.slot)) {
        option.disable(DisabledReason::Blocked);
    }
    grid
}
