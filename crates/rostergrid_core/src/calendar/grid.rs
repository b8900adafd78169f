//! Week grid projection.
//!
//! # Responsibility
//! - Bucket a flat interval list into a 7-day × 24-hour occupancy grid.
//! - Attach the per-viewer display details (labels, colors, "now" marks).
//!
//! # Invariants
//! - A cell is `[cell_start, cell_start + 1h)` with
//!   `cell_start = week_start + day days + hour hours`.
//! - An interval occupies a cell iff `start < cell_end AND end > cell_start`.
//! - Each owner appears at most once per cell.
//! - Projection is pure: no I/O, no clock reads; `now` is passed in.

use crate::calendar::format::{
    format_current_time, format_day_header, format_hour_label, format_week_title, TimeFormat,
};
use crate::calendar::legend::{available_now_summary, legend, LegendEntry};
use crate::calendar::palette::color_for_owner;
use crate::model::interval::{Occupancy, OwnerId};
use crate::service::availability_service::{available_at, IntervalView};
use crate::service::week::WeekWindow;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeSet;

pub const DAYS_IN_GRID: u32 = 7;
pub const HOURS_IN_DAY: u32 = 24;

/// Lightness keyframes `(hour, percent)` for the row background.
const SHADE_KEYFRAMES: [(u32, f64); 7] = [
    (0, 20.0),
    (5, 35.0),
    (8, 75.0),
    (12, 90.0),
    (16, 75.0),
    (19, 35.0),
    (23, 20.0),
];

/// Per-viewer display settings passed into the projector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerContext {
    /// Viewer's own user id, used to outline their marks.
    pub viewer_id: Option<OwnerId>,
    pub time_format: TimeFormat,
}

/// Start instant of cell `(day_index, hour)`, or `None` past the calendar
/// edge.
pub fn cell_start(week_start: NaiveDateTime, day_index: u32, hour: u32) -> Option<NaiveDateTime> {
    week_start
        .checked_add_signed(Duration::days(i64::from(day_index)))?
        .checked_add_signed(Duration::hours(i64::from(hour)))
}

/// Owners occupying cell `(day_index, hour)`, deduplicated, in order of
/// first appearance in `intervals`. A cell past the calendar edge is empty.
pub fn cell_occupants<T: Occupancy>(
    day_index: u32,
    hour: u32,
    week_start: NaiveDateTime,
    intervals: &[T],
) -> Vec<OwnerId> {
    let Some((start, end)) = cell_start(week_start, day_index, hour)
        .and_then(|start| Some((start, start.checked_add_signed(Duration::hours(1))?)))
    else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    intervals
        .iter()
        .filter(|interval| interval.range().overlaps_window(start, end))
        .map(|interval| interval.owner_id())
        .filter(|owner_id| seen.insert(*owner_id))
        .collect()
}

/// Row background for `hour`, interpolated between keyframes.
pub fn hour_shade(hour: u32) -> String {
    let hour = hour.min(HOURS_IN_DAY - 1);
    let (from, to) = SHADE_KEYFRAMES
        .windows(2)
        .find(|pair| hour >= pair[0].0 && hour <= pair[1].0)
        .map(|pair| (pair[0], pair[1]))
        .unwrap_or((SHADE_KEYFRAMES[0], SHADE_KEYFRAMES[SHADE_KEYFRAMES.len() - 1]));

    let span = f64::from((to.0 - from.0).max(1));
    let t = f64::from(hour - from.0) / span;
    let lightness = from.1 + (to.1 - from.1) * t;
    format!("hsl(215, 55%, {lightness:.1}%)")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellOccupant {
    pub owner_id: OwnerId,
    pub color: &'static str,
    pub is_viewer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub day_index: u32,
    pub hour: u32,
    pub start: NaiveDateTime,
    pub occupants: Vec<CellOccupant>,
    /// The cell containing the current instant.
    pub is_now: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRow {
    pub hour: u32,
    pub label: String,
    pub shade: String,
    pub is_now_hour: bool,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHeader {
    pub day_index: u32,
    pub date: NaiveDate,
    pub label: String,
    pub is_today: bool,
}

/// Renderable week: headers, 24 hour rows of 7 cells, legend and the
/// available-now line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub window: WeekWindow,
    pub title: String,
    pub current_time: String,
    pub headers: Vec<DayHeader>,
    pub rows: Vec<HourRow>,
    pub legend: Vec<LegendEntry>,
    pub available_now: Vec<OwnerId>,
    pub available_now_summary: String,
}

impl WeekGrid {
    pub fn project(
        window: WeekWindow,
        intervals: &[IntervalView],
        viewer: &ViewerContext,
        now: NaiveDateTime,
    ) -> Self {
        let today = now.date();
        let now_hour = now.hour();

        let headers = (0..DAYS_IN_GRID)
            .map(|day_index| {
                let date = window.day(day_index);
                DayHeader {
                    day_index,
                    date,
                    label: format_day_header(date),
                    is_today: date == today,
                }
            })
            .collect();

        let rows = (0..HOURS_IN_DAY)
            .map(|hour| HourRow {
                hour,
                label: format_hour_label(hour, viewer.time_format),
                shade: hour_shade(hour),
                is_now_hour: hour == now_hour,
                cells: (0..DAYS_IN_GRID)
                    .map(|day_index| project_cell(window, day_index, hour, intervals, viewer, now))
                    .collect(),
            })
            .collect();

        let present = available_at(now, intervals);

        Self {
            window,
            title: format_week_title(window.day(0), window.day(DAYS_IN_GRID - 1)),
            current_time: format_current_time(now, viewer.time_format),
            headers,
            rows,
            legend: legend(intervals),
            available_now: present.iter().map(|view| view.owner_id).collect(),
            available_now_summary: available_now_summary(present),
        }
    }

    /// Cell at `(day_index, hour)`, if in range.
    pub fn cell(&self, day_index: u32, hour: u32) -> Option<&GridCell> {
        self.rows
            .get(hour as usize)
            .and_then(|row| row.cells.get(day_index as usize))
    }
}

fn project_cell(
    window: WeekWindow,
    day_index: u32,
    hour: u32,
    intervals: &[IntervalView],
    viewer: &ViewerContext,
    now: NaiveDateTime,
) -> GridCell {
    let start = window.cell_start(day_index, hour);
    let occupants = cell_occupants(day_index, hour, window.start(), intervals)
        .into_iter()
        .map(|owner_id| CellOccupant {
            owner_id,
            color: color_for_owner(owner_id),
            is_viewer: viewer.viewer_id == Some(owner_id),
        })
        .collect();

    GridCell {
        day_index,
        hour,
        start,
        occupants,
        is_now: start <= now && now.signed_duration_since(start) < Duration::hours(1),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        cell_occupants, cell_start, hour_shade, ViewerContext, WeekGrid, DAYS_IN_GRID,
        HOURS_IN_DAY,
    };
    use crate::calendar::format::TimeFormat;
    use crate::model::interval::TimeRange;
    use crate::service::availability_service::IntervalView;
    use crate::service::week::{week_window, WeekWindow};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ymd_hm(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .and_then(|date| date.and_hms_opt(h, m, 0))
            .expect("fixture instant should be valid")
    }

    fn week_of(reference: NaiveDateTime) -> WeekWindow {
        week_window(reference).expect("fixture week should be representable")
    }

    fn view(id: i64, owner_id: i64, name: &str, start: NaiveDateTime, end: NaiveDateTime) -> IntervalView {
        IntervalView {
            id,
            owner_id,
            owner_name: name.to_string(),
            range: TimeRange::new(start, end).expect("fixture range should be valid"),
        }
    }

    #[test]
    fn interval_across_midnight_occupies_exactly_three_cells() {
        let window = week_of(ymd_hm(12, 0, 0));
        // Monday 23:30 -> Tuesday 01:30.
        let rows = vec![view(1, 4, "A", ymd_hm(10, 23, 30), ymd_hm(11, 1, 30))];

        let mut occupied = Vec::new();
        for day in 0..DAYS_IN_GRID {
            for hour in 0..HOURS_IN_DAY {
                if !cell_occupants(day, hour, window.start(), &rows).is_empty() {
                    occupied.push((day, hour));
                }
            }
        }
        assert_eq!(occupied, vec![(1, 23), (2, 0), (2, 1)]);
    }

    #[test]
    fn same_owner_collapses_to_one_mark() {
        let window = week_of(ymd_hm(12, 0, 0));
        let rows = vec![
            view(1, 2, "B", ymd_hm(10, 9, 0), ymd_hm(10, 9, 30)),
            view(2, 3, "C", ymd_hm(10, 9, 0), ymd_hm(10, 10, 0)),
            view(3, 2, "B", ymd_hm(10, 9, 30), ymd_hm(10, 10, 0)),
        ];
        assert_eq!(cell_occupants(1, 9, window.start(), &rows), vec![2, 3]);
        assert!(cell_occupants(1, 10, window.start(), &rows).is_empty());
    }

    #[test]
    fn shade_hits_keyframes() {
        assert_eq!(hour_shade(0), "hsl(215, 55%, 20.0%)");
        assert_eq!(hour_shade(12), "hsl(215, 55%, 90.0%)");
        assert_eq!(hour_shade(23), "hsl(215, 55%, 20.0%)");
        assert_eq!(hour_shade(6), "hsl(215, 55%, 48.3%)");
    }

    #[test]
    fn projection_marks_now_viewer_and_legend() {
        let window = week_of(ymd_hm(12, 0, 0));
        let now = ymd_hm(10, 12, 15);
        let rows = vec![
            view(1, 2, "bea", ymd_hm(10, 9, 0), ymd_hm(10, 17, 0)),
            view(2, 1, "Ann", ymd_hm(11, 9, 0), ymd_hm(11, 10, 0)),
        ];
        let viewer = ViewerContext {
            viewer_id: Some(2),
            time_format: TimeFormat::TwentyFourHour,
        };

        let grid = WeekGrid::project(window, &rows, &viewer, now);

        assert_eq!(grid.title, "Week of Jun 9 \u{2013} Jun 15");
        assert_eq!(grid.rows.len(), 24);
        assert_eq!(grid.rows[9].label, "0900");
        assert!(grid.rows[12].is_now_hour);
        assert!(grid.headers[1].is_today);
        assert!(!grid.headers[0].is_today);

        let cell = grid.cell(1, 12).expect("monday noon cell should exist");
        assert!(cell.is_now);
        assert_eq!(cell.occupants.len(), 1);
        assert!(cell.occupants[0].is_viewer);
        assert!(!grid.cell(2, 12).expect("tuesday noon cell should exist").is_now);

        let names: Vec<&str> = grid.legend.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "bea"]);
        assert_eq!(grid.available_now, vec![2]);
        assert_eq!(grid.available_now_summary, "Available now: bea");
    }

    #[test]
    fn cells_past_the_calendar_edge_are_empty() {
        let edge = NaiveDate::MAX
            .and_hms_opt(22, 0, 0)
            .expect("late hour on the last date should exist");
        assert_eq!(cell_start(edge, 0, 1), Some(edge + chrono::Duration::hours(1)));
        assert_eq!(cell_start(edge, 1, 0), None);

        let rows = vec![view(1, 1, "A", ymd_hm(10, 9, 0), ymd_hm(10, 10, 0))];
        assert!(cell_occupants(0, 1, edge, &rows).is_empty());
        assert!(cell_occupants(6, 23, edge, &rows).is_empty());
    }
}
