//! Sunday-anchored week windows.
//!
//! # Invariants
//! - A window always spans exactly seven calendar days, `[start, start + 7d)`.
//! - Windows built by [`week_window`] start on a Sunday at local midnight.
//! - Constructors return `None` when the window would leave chrono's
//!   representable range; an existing window never overflows internally.

use crate::clock::Clock;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

pub const DAYS_PER_WEEK: i64 = 7;

/// Half-open seven-day range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Week containing `reference`: most recent Sunday 00:00 at or before it.
pub fn week_window(reference: NaiveDateTime) -> Option<WeekWindow> {
    let date = reference.date();
    let back = i64::from(date.weekday().num_days_from_sunday());
    WeekWindow::starting_on(date.checked_sub_signed(Duration::days(back))?)
}

impl WeekWindow {
    /// Window beginning at midnight of `date`, without snapping to Sunday.
    pub fn starting_on(date: NaiveDate) -> Option<Self> {
        let start = date.and_time(NaiveTime::MIN);
        let end = start.checked_add_signed(Duration::days(DAYS_PER_WEEK))?;
        Some(Self { start, end })
    }

    /// Week containing the clock's current instant.
    pub fn this_week(clock: &impl Clock) -> Option<Self> {
        week_window(clock.now())
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// The Sunday-anchored week before this one.
    pub fn previous(&self) -> Option<Self> {
        week_window(self.start.checked_sub_signed(Duration::days(DAYS_PER_WEEK))?)
    }

    /// The Sunday-anchored week after this one.
    pub fn next(&self) -> Option<Self> {
        week_window(self.end)
    }

    /// Calendar date of day `index` (0 = first day of the window).
    ///
    /// `index` is clamped to the last day, which keeps the result inside
    /// the window.
    pub fn day(&self, index: u32) -> NaiveDate {
        let offset = i64::from(index).min(DAYS_PER_WEEK - 1);
        self.start.date() + Duration::days(offset)
    }

    /// Start of the hour cell `hour` on day `day_index`, both clamped to
    /// the window.
    pub fn cell_start(&self, day_index: u32, hour: u32) -> NaiveDateTime {
        self.day(day_index).and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour.min(23)))
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}
