//! Stable per-owner colors.
//!
//! The mapping is a pure function of the owner id, so every client renders
//! the same owner in the same color without shared state.

use crate::model::interval::OwnerId;

/// Fixed owner palette: blue, green, orange, purple, yellow, pink, sky.
pub const PALETTE: [&str; 7] = [
    "#3b82f6", "#22c55e", "#f97316", "#a855f7", "#eab308", "#ec4899", "#0ea5e9",
];

/// `PALETTE[(owner_id - 1) mod len]`, Euclidean so any id maps in range.
pub fn color_for_owner(owner_id: OwnerId) -> &'static str {
    let len = PALETTE.len() as i64;
    let index = owner_id.wrapping_sub(1).rem_euclid(len);
    PALETTE[index as usize]
}
