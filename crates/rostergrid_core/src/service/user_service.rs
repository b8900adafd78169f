//! Admin account-creation use-case.
//!
//! # Invariants
//! - Only an authenticated `ADMIN` caller may create accounts.
//! - Name and email are trimmed; blank values are rejected before storage.
//! - Duplicate emails (case-insensitive) are reported, never overwritten.

use crate::identity::IdentityProvider;
use crate::model::user::{Role, User};
use crate::repo::user_repo::{NewUser, UserRepository};
use crate::repo::RepoError;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Account-creation request as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `"ADMIN"` grants admin; anything else (or nothing) yields `USER`.
    pub role: Option<String>,
}

#[derive(Debug)]
pub enum UserServiceError {
    NotAuthorized,
    MissingField(&'static str),
    InvalidEmail(String),
    DuplicateEmail(String),
    Repo(RepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthorized => write!(f, "not authorized"),
            Self::MissingField(field) => write!(f, "missing field: {field}"),
            Self::InvalidEmail(email) => write!(f, "invalid email: `{email}`"),
            Self::DuplicateEmail(email) => write!(f, "user with email `{email}` already exists"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateEmail(email) => Self::DuplicateEmail(email),
            other => Self::Repo(other),
        }
    }
}

/// User service facade over a repository implementation.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an account on behalf of an admin caller.
    pub fn create_user(
        &self,
        caller: &impl IdentityProvider,
        request: &CreateUserRequest,
    ) -> Result<User, UserServiceError> {
        let actor = match caller.current_identity() {
            Some(identity) if identity.is_admin() => identity,
            other => {
                warn!(
                    "event=user_create module=service status=rejected actor_id={} error_code=not_authorized",
                    other.map_or(0, |identity| identity.user_id)
                );
                return Err(UserServiceError::NotAuthorized);
            }
        };

        let new_user = validate_request(request)?;
        if self.repo.find_by_email(&new_user.email)?.is_some() {
            return Err(UserServiceError::DuplicateEmail(new_user.email));
        }

        let created = self.repo.create_user(&new_user)?;
        info!(
            "event=user_create module=service status=ok actor_id={} user_id={} role={}",
            actor.user_id,
            created.id,
            created.role.as_str()
        );
        Ok(created)
    }

    /// Creates an account without a caller check. Used for bootstrap of the
    /// first admin.
    pub fn create_bootstrap_user(&self, new_user: &NewUser) -> Result<User, UserServiceError> {
        Ok(self.repo.create_user(new_user)?)
    }

    pub fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repo.list_users()?)
    }
}

fn validate_request(request: &CreateUserRequest) -> Result<NewUser, UserServiceError> {
    let name = required(request.name.as_deref(), "name")?;
    let email = required(request.email.as_deref(), "email")?;
    if !EMAIL_RE.is_match(&email) {
        return Err(UserServiceError::InvalidEmail(email));
    }

    Ok(NewUser {
        name,
        email,
        role: Role::from_request(request.role.as_deref()),
    })
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, UserServiceError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(UserServiceError::MissingField(field))
}
