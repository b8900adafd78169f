//! Display formatting for hour labels, dates and the current time.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Viewer's clock preference. Display-only; never stored with intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12")]
    TwelveHour,
    #[serde(rename = "24")]
    TwentyFourHour,
}

impl TimeFormat {
    pub fn is_24h(self) -> bool {
        self == Self::TwentyFourHour
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::TwelveHour => Self::TwentyFourHour,
            Self::TwentyFourHour => Self::TwelveHour,
        }
    }

    /// Persisted preference value (`"12"` / `"24"`).
    pub fn as_pref_str(self) -> &'static str {
        match self {
            Self::TwelveHour => "12",
            Self::TwentyFourHour => "24",
        }
    }

    pub fn from_pref_str(value: &str) -> Option<Self> {
        match value.trim() {
            "12" => Some(Self::TwelveHour),
            "24" => Some(Self::TwentyFourHour),
            _ => None,
        }
    }
}

/// Row label for `hour` (0..=23; larger values wrap).
///
/// - 24-hour: `"0900"`, `"1400"`.
/// - 12-hour: `"12 AM"`, `"9 AM"`, `"12 PM"`, `"2 PM"`.
pub fn format_hour_label(hour: u32, format: TimeFormat) -> String {
    let hour = hour % 24;
    match format {
        TimeFormat::TwentyFourHour => format!("{hour:02}00"),
        TimeFormat::TwelveHour => {
            let suffix = if hour < 12 { "AM" } else { "PM" };
            let display = match hour % 12 {
                0 => 12,
                other => other,
            };
            format!("{display} {suffix}")
        }
    }
}

/// Column header, e.g. `"Sun, Jun 9"`.
pub fn format_day_header(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// `"Week of Jun 9 – Jun 15"` for a window starting on `first_day`.
pub fn format_week_title(first_day: NaiveDate, last_day: NaiveDate) -> String {
    format!(
        "Week of {} \u{2013} {}",
        first_day.format("%b %-d"),
        last_day.format("%b %-d")
    )
}

/// Weekday plus clock time, e.g. `"Mon 09:05"` or `"Mon 09:05 AM"`.
pub fn format_current_time(now: NaiveDateTime, format: TimeFormat) -> String {
    match format {
        TimeFormat::TwentyFourHour => now.format("%a %H:%M").to_string(),
        TimeFormat::TwelveHour => now.format("%a %I:%M %p").to_string(),
    }
}
