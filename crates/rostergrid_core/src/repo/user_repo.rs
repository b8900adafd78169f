//! User account repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Emails are unique case-insensitively (`COLLATE NOCASE`); a collision
//!   surfaces as `RepoError::DuplicateEmail`.
//! - Stored role text must parse back to a `Role`.

use crate::model::user::{Role, User, UserId};
use crate::repo::{table_exists, RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT id, name, email, role FROM users";

/// Account creation input. Credentials are handled outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// All users sorted by name (case-insensitive).
    fn list_users(&self) -> RepoResult<Vec<User>>;
}

/// Display-name lookup used to label intervals.
pub trait UserDirectory {
    fn find_name(&self, id: UserId) -> RepoResult<Option<String>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "users")? {
            return Err(RepoError::MissingRequiredTable("users"));
        }
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let inserted = self.conn.execute(
            "INSERT INTO users (name, email, role) VALUES (?1, ?2, ?3);",
            params![user.name.as_str(), user.email.as_str(), user.role.as_str()],
        );

        match inserted {
            Ok(_) => Ok(User {
                id: self.conn.last_insert_rowid(),
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role,
            }),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::DuplicateEmail(user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([email])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

impl UserDirectory for SqliteUserRepository<'_> {
    fn find_name(&self, id: UserId) -> RepoResult<Option<String>> {
        let name = self
            .conn
            .query_row("SELECT name FROM users WHERE id = ?1;", [id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(name)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: UserId = row.get("id")?;
    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` for user {id}"))
    })?;

    Ok(User {
        id,
        name: row.get("name")?,
        email: row.get("email")?,
        role,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
