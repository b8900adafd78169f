//! Availability reconciler.
//!
//! # Responsibility
//! - Enforce the per-owner non-overlap rule through replace-on-insert writes.
//! - Answer window and "available now" queries, joining owner names.
//!
//! # Invariants
//! - `set_availability` never leaves both an old overlapping interval and the
//!   new one visible; delete + insert commit together.
//! - `clear_availability` is idempotent and never fails on empty input.
//! - Every query re-reads storage; nothing is cached across calls.

use crate::clock::Clock;
use crate::identity::IdentityProvider;
use crate::model::interval::{
    to_storage_precision, AvailabilityInterval, IntervalId, InvalidRange, Occupancy, OwnerId,
    TimeRange,
};
use crate::repo::interval_repo::IntervalRepository;
use crate::repo::user_repo::UserDirectory;
use crate::repo::{RepoError, RepoResult};
use crate::service::week::WeekWindow;
use chrono::NaiveDateTime;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Reconciler error taxonomy.
#[derive(Debug)]
pub enum AvailabilityError {
    /// `end` not strictly after `start`.
    InvalidRange(InvalidRange),
    /// No caller identity.
    NotAuthenticated,
    /// Opaque storage failure.
    Persistence(RepoError),
    /// Stored data contradicts itself (e.g. interval without owner).
    InconsistentState(String),
}

impl Display for AvailabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange(err) => write!(f, "{err}"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent availability state: {details}")
            }
        }
    }
}

impl Error for AvailabilityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRange(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidRange> for AvailabilityError {
    fn from(value: InvalidRange) -> Self {
        Self::InvalidRange(value)
    }
}

impl From<RepoError> for AvailabilityError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidRange(range) => Self::InvalidRange(range),
            other => Self::Persistence(other),
        }
    }
}

/// Interval joined with its owner's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalView {
    pub id: IntervalId,
    pub owner_id: OwnerId,
    pub owner_name: String,
    #[serde(flatten)]
    pub range: TimeRange,
}

impl IntervalView {
    pub fn start(&self) -> NaiveDateTime {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDateTime {
        self.range.end()
    }
}

impl Occupancy for IntervalView {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn range(&self) -> TimeRange {
        self.range
    }
}

/// Owners available at `instant`, one representative interval each.
///
/// An owner qualifies when any interval has `start <= instant < end`. When
/// several intervals of the same owner qualify, the first in input order
/// stands for the owner. Output keeps first-appearance order.
pub fn available_at<T: Occupancy>(instant: NaiveDateTime, intervals: &[T]) -> Vec<&T> {
    let mut seen = BTreeSet::new();
    intervals
        .iter()
        .filter(|interval| interval.range().contains(instant))
        .filter(|interval| seen.insert(interval.owner_id()))
        .collect()
}

/// Reconciler over an interval store, a user directory and a clock.
pub struct AvailabilityService<I, U, C> {
    intervals: I,
    users: U,
    clock: C,
}

impl<I, U, C> AvailabilityService<I, U, C>
where
    I: IntervalRepository,
    U: UserDirectory,
    C: Clock,
{
    pub fn new(intervals: I, users: U, clock: C) -> Self {
        Self {
            intervals,
            users,
            clock,
        }
    }

    /// Current instant from the injected clock.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Replaces the owner's availability touching `[start, end)` with one
    /// interval covering exactly that range.
    ///
    /// Partially overlapping intervals are deleted whole, not trimmed.
    pub fn set_availability(
        &self,
        owner_id: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<AvailabilityInterval, AvailabilityError> {
        let range = TimeRange::new(start, end).map_err(|err| {
            warn!(
                "event=availability_set module=service status=rejected owner_id={} error_code=invalid_range",
                owner_id
            );
            err
        })?;

        let started_at = Instant::now();
        match self.intervals.replace_overlapping(owner_id, range) {
            Ok(created) => {
                info!(
                    "event=availability_set module=service status=ok owner_id={} interval_id={} duration_ms={}",
                    owner_id,
                    created.id,
                    started_at.elapsed().as_millis()
                );
                Ok(created)
            }
            Err(err) => {
                error!(
                    "event=availability_set module=service status=error owner_id={} duration_ms={} error={}",
                    owner_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Removes the owner's intervals touching `[start, end)`.
    ///
    /// Returns how many intervals were removed. An empty or inverted range
    /// is acknowledged without touching storage; both ends are compared at
    /// millisecond precision.
    pub fn clear_availability(
        &self,
        owner_id: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize, AvailabilityError> {
        let start = to_storage_precision(start);
        let end = to_storage_precision(end);
        if start >= end {
            info!(
                "event=availability_clear module=service status=noop owner_id={} reason=empty_range",
                owner_id
            );
            return Ok(0);
        }

        let removed = self
            .intervals
            .delete_overlapping(owner_id, start, end)
            .map_err(|err| {
                error!(
                    "event=availability_clear module=service status=error owner_id={} error={}",
                    owner_id, err
                );
                err
            })?;
        info!(
            "event=availability_clear module=service status=ok owner_id={} removed={}",
            owner_id, removed
        );
        Ok(removed)
    }

    /// Authenticated variant of [`Self::set_availability`] for the caller.
    pub fn set_for_caller(
        &self,
        identity: &impl IdentityProvider,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<AvailabilityInterval, AvailabilityError> {
        let caller = identity
            .current_identity()
            .ok_or(AvailabilityError::NotAuthenticated)?;
        self.set_availability(caller.user_id, start, end)
    }

    /// Authenticated variant of [`Self::clear_availability`] for the caller.
    pub fn clear_for_caller(
        &self,
        identity: &impl IdentityProvider,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize, AvailabilityError> {
        let caller = identity
            .current_identity()
            .ok_or(AvailabilityError::NotAuthenticated)?;
        self.clear_availability(caller.user_id, start, end)
    }

    /// Raw intervals of any owner intersecting the window, by start.
    pub fn find_overlapping(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<AvailabilityInterval>, AvailabilityError> {
        Ok(self.intervals.find_overlapping(window_start, window_end)?)
    }

    /// Intervals touching the week, enriched with owner names.
    pub fn list_week(&self, window: WeekWindow) -> Result<Vec<IntervalView>, AvailabilityError> {
        let raw = self.find_overlapping(window.start(), window.end())?;
        self.enrich(raw)
    }

    /// Who is available at the clock's current instant, among the intervals
    /// touching `window`.
    pub fn available_now(&self, window: WeekWindow) -> Result<Vec<IntervalView>, AvailabilityError> {
        let views = self.list_week(window)?;
        let now = self.clock.now();
        Ok(available_at(now, &views).into_iter().cloned().collect())
    }

    fn enrich(
        &self,
        intervals: Vec<AvailabilityInterval>,
    ) -> Result<Vec<IntervalView>, AvailabilityError> {
        let mut names: BTreeMap<OwnerId, String> = BTreeMap::new();
        let mut views = Vec::with_capacity(intervals.len());

        for interval in intervals {
            let owner_name = match names.get(&interval.owner_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.lookup_name(interval.owner_id)?.ok_or_else(|| {
                        AvailabilityError::InconsistentState(format!(
                            "interval {} references missing owner {}",
                            interval.id, interval.owner_id
                        ))
                    })?;
                    names.insert(interval.owner_id, name.clone());
                    name
                }
            };

            views.push(IntervalView {
                id: interval.id,
                owner_id: interval.owner_id,
                owner_name,
                range: interval.range,
            });
        }

        Ok(views)
    }

    fn lookup_name(&self, owner_id: OwnerId) -> RepoResult<Option<String>> {
        self.users.find_name(owner_id)
    }
}
