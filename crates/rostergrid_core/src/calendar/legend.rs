//! Week legend and the "available now" line.

use crate::calendar::palette::color_for_owner;
use crate::model::interval::OwnerId;
use crate::service::availability_service::IntervalView;
use serde::Serialize;
use std::collections::BTreeSet;

pub const NOBODY_AVAILABLE_MESSAGE: &str = "No one is marked available right now.";

/// One legend row per distinct owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub owner_id: OwnerId,
    pub display_name: String,
    pub color: &'static str,
}

/// Distinct owners of `intervals`, sorted by case-insensitive name
/// (owner id breaks ties).
pub fn legend(intervals: &[IntervalView]) -> Vec<LegendEntry> {
    let mut seen = BTreeSet::new();
    let mut entries: Vec<LegendEntry> = intervals
        .iter()
        .filter(|view| seen.insert(view.owner_id))
        .map(|view| LegendEntry {
            owner_id: view.owner_id,
            display_name: view.owner_name.clone(),
            color: color_for_owner(view.owner_id),
        })
        .collect();

    entries.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then(a.owner_id.cmp(&b.owner_id))
    });
    entries
}

/// `"Available now: A, B"`, with names deduplicated in order of appearance.
pub fn available_now_summary<'a>(available: impl IntoIterator<Item = &'a IntervalView>) -> String {
    let mut seen = BTreeSet::new();
    let names: Vec<&str> = available
        .into_iter()
        .map(|view| view.owner_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect();

    if names.is_empty() {
        NOBODY_AVAILABLE_MESSAGE.to_string()
    } else {
        format!("Available now: {}", names.join(", "))
    }
}
