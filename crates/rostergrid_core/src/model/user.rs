//! Staff account model and caller identity.
//!
//! # Invariants
//! - `email` is unique across users.
//! - Accounts are immutable once created within this crate.

use serde::{Deserialize, Serialize};

/// Stable user identifier. Numbering starts at 1.
pub type UserId = i64;

/// Account role. Only admins may create accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parses stored role text. Unknown values are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Lenient mapping used by account creation: only an exact `ADMIN`
    /// grants the admin role.
    pub fn from_request(value: Option<&str>) -> Self {
        match value {
            Some("ADMIN") => Self::Admin,
            _ => Self::User,
        }
    }
}

/// Persisted staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Authenticated caller as yielded by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }
}
