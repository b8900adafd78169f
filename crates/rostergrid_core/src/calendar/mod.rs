//! Calendar grid projector.
//!
//! Pure transformations from `(week window, intervals)` to renderable views:
//! occupancy grid, owner colors, hour labels, legend and slot selection.

pub mod format;
pub mod grid;
pub mod legend;
pub mod palette;
pub mod selection;
