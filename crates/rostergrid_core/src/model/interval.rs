//! Availability interval domain model.
//!
//! # Responsibility
//! - Define the half-open `[start, end)` range an owner declares available.
//! - Provide the overlap/containment predicates shared by store, reconciler
//!   and grid projector.
//!
//! # Invariants
//! - `TimeRange::start < TimeRange::end` always holds; the only constructor
//!   that accepts arbitrary endpoints validates it.
//! - Endpoints carry millisecond precision, the same as storage, so a range
//!   reads back exactly as it was written.
//! - Intervals are never mutated in place; replacement is delete + insert.

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of a stored availability interval.
pub type IntervalId = i64;

/// Identifier of the user owning an interval (`users.id`).
pub type OwnerId = i64;

/// Rejected range where `end` is not strictly after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Display for InvalidRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "end must be after start (start={}, end={})",
            self.start, self.end
        )
    }
}

impl Error for InvalidRange {}

/// Validated half-open wall-clock range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct TimeRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeRange {
    /// Builds a range, rejecting zero or negative length.
    ///
    /// Both endpoints are truncated to whole milliseconds first, so a range
    /// shorter than a millisecond is rejected here rather than in storage.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, InvalidRange> {
        let start = to_storage_precision(start);
        let end = to_storage_precision(end);
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidRange { start, end })
        }
    }

    /// `[start, start + 1h)`, or `None` past the last representable instant.
    pub fn one_hour_from(start: NaiveDateTime) -> Option<Self> {
        let start = to_storage_precision(start);
        let end = start.checked_add_signed(Duration::hours(1))?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// `start <= instant < end`.
    #[inline]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Half-open intersection test against raw window bounds.
    #[inline]
    pub fn overlaps_window(&self, window_start: NaiveDateTime, window_end: NaiveDateTime) -> bool {
        self.start < window_end && self.end > window_start
    }

    /// Half-open intersection test against another range.
    #[inline]
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.overlaps_window(other.start, other.end)
    }
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = InvalidRange;

    fn try_from(value: RawRange) -> Result<Self, Self::Error> {
        TimeRange::new(value.start, value.end)
    }
}

impl From<TimeRange> for RawRange {
    fn from(value: TimeRange) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}

/// One stored availability block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityInterval {
    pub id: IntervalId,
    pub owner_id: OwnerId,
    #[serde(flatten)]
    pub range: TimeRange,
}

impl AvailabilityInterval {
    pub fn start(&self) -> NaiveDateTime {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDateTime {
        self.range.end()
    }
}

/// Anything that places one owner on the timeline.
///
/// Implemented by raw store rows and by name-enriched views so the
/// reconciler and the grid projector work over either.
pub trait Occupancy {
    fn owner_id(&self) -> OwnerId;
    fn range(&self) -> TimeRange;
}

impl Occupancy for AvailabilityInterval {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn range(&self) -> TimeRange {
        self.range
    }
}

impl<T: Occupancy + ?Sized> Occupancy for &T {
    fn owner_id(&self) -> OwnerId {
        (**self).owner_id()
    }

    fn range(&self) -> TimeRange {
        (**self).range()
    }
}

/// Drops sub-millisecond digits, matching what storage keeps.
pub fn to_storage_precision(instant: NaiveDateTime) -> NaiveDateTime {
    instant.trunc_subsecs(3)
}

/// Converts a wall-clock instant to the millisecond encoding used in storage.
///
/// The naive value is interpreted as if it were UTC, so the encoding is
/// stable regardless of the host time zone.
pub fn to_wall_clock_millis(instant: NaiveDateTime) -> i64 {
    instant.and_utc().timestamp_millis()
}

/// Inverse of [`to_wall_clock_millis`]. Returns `None` when out of range.
pub fn from_wall_clock_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|value| value.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::{from_wall_clock_millis, to_wall_clock_millis, TimeRange};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("fixture instant should be valid")
    }

    fn at_micros(micros: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .and_then(|date| date.and_hms_micro_opt(9, 0, 0, micros))
            .expect("fixture instant should be valid")
    }

    #[test]
    fn zero_length_range_is_rejected() {
        let err = TimeRange::new(at(9, 0), at(9, 0)).expect_err("empty range should be rejected");
        assert_eq!(err.start, at(9, 0));
        assert!(TimeRange::new(at(10, 0), at(9, 0)).is_err());
    }

    #[test]
    fn sub_millisecond_range_is_rejected() {
        let err = TimeRange::new(at_micros(100), at_micros(900))
            .expect_err("range inside one millisecond should collapse");
        assert_eq!(err.start, at(9, 0));
        assert_eq!(err.end, at(9, 0));
    }

    #[test]
    fn endpoints_are_kept_at_millisecond_precision() {
        let range = TimeRange::new(at_micros(400), at_micros(2_600))
            .expect("range spanning two milliseconds should be valid");
        assert_eq!(range.start(), at(9, 0));
        assert_eq!(range.end(), at_micros(2_000));
        assert_eq!(
            from_wall_clock_millis(to_wall_clock_millis(range.end())),
            Some(range.end())
        );
    }

    #[test]
    fn one_hour_from_stops_at_the_calendar_edge() {
        let range = TimeRange::one_hour_from(at(23, 30)).expect("late evening should fit");
        assert_eq!(range.end(), at(23, 30) + chrono::Duration::hours(1));
        assert_eq!(TimeRange::one_hour_from(NaiveDateTime::MAX), None);
    }

    #[test]
    fn contains_is_half_open() {
        let range = TimeRange::new(at(9, 0), at(17, 0)).expect("working day should be valid");
        assert!(range.contains(at(9, 0)));
        assert!(range.contains(at(16, 59)));
        assert!(!range.contains(at(17, 0)));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let morning = TimeRange::new(at(9, 0), at(12, 0)).expect("morning should be valid");
        let afternoon = TimeRange::new(at(12, 0), at(15, 0)).expect("afternoon should be valid");
        assert!(!morning.overlaps(&afternoon));
        let noon = TimeRange::new(at(11, 59), at(12, 1)).expect("noon slice should be valid");
        assert!(morning.overlaps(&noon));
    }

    #[test]
    fn deserialize_rejects_inverted_range() {
        let result: Result<TimeRange, _> =
            serde_json::from_str(r#"{"start":"2024-06-10T10:00:00","end":"2024-06-10T09:00:00"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn wall_clock_millis_are_lossless() {
        let instant = at(23, 30);
        assert_eq!(
            from_wall_clock_millis(to_wall_clock_millis(instant)),
            Some(instant)
        );
    }
}
