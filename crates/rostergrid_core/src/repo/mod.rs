//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for intervals and users.
//! - Isolate SQLite query details from reconciler/business orchestration.
//!
//! # Invariants
//! - Interval writes validate `start < end` before any SQL mutation.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories carry no display concerns (names are joined by services).

use crate::db::DbError;
use crate::model::interval::InvalidRange;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod interval_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by interval and user persistence.
#[derive(Debug)]
pub enum RepoError {
    InvalidRange(InvalidRange),
    Db(DbError),
    DuplicateEmail(String),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateEmail(email) => write!(f, "user with email `{email}` already exists"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRange(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidRange> for RepoError {
    fn from(value: InvalidRange) -> Self {
        Self::InvalidRange(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn table_exists(conn: &rusqlite::Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
