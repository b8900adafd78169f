//! Domain model for staff availability.
//!
//! # Responsibility
//! - Define the canonical interval and account shapes used by core logic.
//!
//! # Invariants
//! - Every stored interval has `start < end`.
//! - Every interval is exclusively owned by one user.

pub mod interval;
pub mod user;
