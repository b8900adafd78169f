//! Cell-click slot selection.
//!
//! A viewer picks a start cell, then an end as "same day / next day / in two
//! days" plus an hour. The resulting range feeds `set_availability`; the
//! one-hour cell range feeds `clear_availability`.

use crate::model::interval::{InvalidRange, TimeRange};
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

/// Largest allowed end-day offset (0 = same day).
pub const MAX_END_DAY_OFFSET: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSelection {
    start: NaiveDateTime,
    end_day_offset: u32,
    end_hour: u32,
}

impl SlotSelection {
    /// Starts a selection at a cell start; the end defaults to the following
    /// hour on the same day (`23:00` wraps to `00:00`, which is rejected by
    /// [`Self::range`] until the viewer moves the end forward).
    pub fn new(cell_start: NaiveDateTime) -> Self {
        Self {
            start: cell_start,
            end_day_offset: 0,
            end_hour: (cell_start.hour() + 1) % 24,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end_day_offset(&self) -> u32 {
        self.end_day_offset
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Clamped to `0..=MAX_END_DAY_OFFSET`.
    pub fn with_end_day_offset(mut self, offset: u32) -> Self {
        self.end_day_offset = offset.min(MAX_END_DAY_OFFSET);
        self
    }

    /// Clamped to `0..=23`.
    pub fn with_end_hour(mut self, hour: u32) -> Self {
        self.end_hour = hour.min(23);
        self
    }

    /// Selected end instant on the hour, or `None` past the calendar edge.
    pub fn end(&self) -> Option<NaiveDateTime> {
        let day = self
            .start
            .date()
            .checked_add_signed(Duration::days(i64::from(self.end_day_offset)))?;
        let time = NaiveTime::from_hms_opt(self.end_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        Some(day.and_time(time))
    }

    /// Validated `[start, end)`.
    ///
    /// An end past the calendar edge is reported as an empty range at
    /// `start`.
    pub fn range(&self) -> Result<TimeRange, InvalidRange> {
        let end = self.end().ok_or(InvalidRange {
            start: self.start,
            end: self.start,
        })?;
        TimeRange::new(self.start, end)
    }

    /// The single hour starting at the selected cell.
    pub fn clear_range(&self) -> Option<TimeRange> {
        TimeRange::one_hour_from(self.start)
    }
}
