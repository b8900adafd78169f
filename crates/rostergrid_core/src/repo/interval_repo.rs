//! Interval store contract and SQLite implementation.
//!
//! # Responsibility
//! - Create, delete-overlapping and window-query availability intervals.
//! - Provide the atomic replace primitive the reconciler builds on.
//!
//! # Invariants
//! - Overlap is half-open on both sides: `start < window_end AND end > window_start`.
//! - Window queries are ordered by `start ASC, id ASC`.
//! - `replace_overlapping` runs delete + insert in one `IMMEDIATE`
//!   transaction; no reader ever observes the deleted-but-not-inserted gap.

use crate::model::interval::{
    from_wall_clock_millis, to_wall_clock_millis, AvailabilityInterval, OwnerId, TimeRange,
};
use crate::repo::{table_exists, RepoError, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const INTERVAL_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    start_ms,
    end_ms
FROM availability_intervals";

/// Persistence contract for availability intervals.
pub trait IntervalRepository {
    /// Every interval, any owner, intersecting `[window_start, window_end)`.
    fn find_overlapping(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> RepoResult<Vec<AvailabilityInterval>>;

    /// Removes the owner's intervals intersecting `[start, end)`.
    /// Returns the number of removed rows; zero is not an error.
    fn delete_overlapping(
        &self,
        owner_id: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepoResult<usize>;

    /// Inserts a new interval. Fails with `InvalidRange` unless `start < end`.
    fn insert(
        &self,
        owner_id: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepoResult<AvailabilityInterval>;

    /// Deletes the owner's overlapping intervals and inserts `range` as one
    /// atomic unit.
    fn replace_overlapping(
        &self,
        owner_id: OwnerId,
        range: TimeRange,
    ) -> RepoResult<AvailabilityInterval>;

    /// All intervals of one owner ordered by start.
    fn list_for_owner(&self, owner_id: OwnerId) -> RepoResult<Vec<AvailabilityInterval>>;
}

/// SQLite-backed interval store.
pub struct SqliteIntervalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIntervalRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "availability_intervals")? {
            return Err(RepoError::MissingRequiredTable("availability_intervals"));
        }
        Ok(Self { conn })
    }
}

impl IntervalRepository for SqliteIntervalRepository<'_> {
    fn find_overlapping(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> RepoResult<Vec<AvailabilityInterval>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INTERVAL_SELECT_SQL}
             WHERE start_ms < ?1
               AND end_ms > ?2
             ORDER BY start_ms ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            to_wall_clock_millis(window_end),
            to_wall_clock_millis(window_start),
        ])?;

        let mut intervals = Vec::new();
        while let Some(row) = rows.next()? {
            intervals.push(parse_interval_row(row)?);
        }
        Ok(intervals)
    }

    fn delete_overlapping(
        &self,
        owner_id: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepoResult<usize> {
        delete_overlapping_in(self.conn, owner_id, start, end)
    }

    fn insert(
        &self,
        owner_id: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepoResult<AvailabilityInterval> {
        let range = TimeRange::new(start, end)?;
        insert_in(self.conn, owner_id, range)
    }

    fn replace_overlapping(
        &self,
        owner_id: OwnerId,
        range: TimeRange,
    ) -> RepoResult<AvailabilityInterval> {
        // IMMEDIATE takes the write lock up front so two replacers for the
        // same owner cannot both read-then-write.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_overlapping_in(&tx, owner_id, range.start(), range.end())?;
        let created = insert_in(&tx, owner_id, range)?;
        tx.commit()?;
        Ok(created)
    }

    fn list_for_owner(&self, owner_id: OwnerId) -> RepoResult<Vec<AvailabilityInterval>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INTERVAL_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY start_ms ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([owner_id])?;

        let mut intervals = Vec::new();
        while let Some(row) = rows.next()? {
            intervals.push(parse_interval_row(row)?);
        }
        Ok(intervals)
    }
}

fn delete_overlapping_in(
    conn: &Connection,
    owner_id: OwnerId,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> RepoResult<usize> {
    let removed = conn.execute(
        "DELETE FROM availability_intervals
         WHERE owner_id = ?1
           AND start_ms < ?2
           AND end_ms > ?3;",
        params![
            owner_id,
            to_wall_clock_millis(end),
            to_wall_clock_millis(start),
        ],
    )?;
    Ok(removed)
}

fn insert_in(
    conn: &Connection,
    owner_id: OwnerId,
    range: TimeRange,
) -> RepoResult<AvailabilityInterval> {
    conn.execute(
        "INSERT INTO availability_intervals (owner_id, start_ms, end_ms)
         VALUES (?1, ?2, ?3);",
        params![
            owner_id,
            to_wall_clock_millis(range.start()),
            to_wall_clock_millis(range.end()),
        ],
    )?;

    Ok(AvailabilityInterval {
        id: conn.last_insert_rowid(),
        owner_id,
        range,
    })
}

fn parse_interval_row(row: &Row<'_>) -> RepoResult<AvailabilityInterval> {
    let id: i64 = row.get("id")?;
    let start_ms: i64 = row.get("start_ms")?;
    let end_ms: i64 = row.get("end_ms")?;

    let start = from_wall_clock_millis(start_ms).ok_or_else(|| {
        RepoError::InvalidData(format!("start_ms `{start_ms}` out of range for interval {id}"))
    })?;
    let end = from_wall_clock_millis(end_ms).ok_or_else(|| {
        RepoError::InvalidData(format!("end_ms `{end_ms}` out of range for interval {id}"))
    })?;
    let range = TimeRange::new(start, end).map_err(|err| {
        RepoError::InvalidData(format!("interval {id} has non-positive length: {err}"))
    })?;

    Ok(AvailabilityInterval {
        id,
        owner_id: row.get("owner_id")?,
        range,
    })
}
