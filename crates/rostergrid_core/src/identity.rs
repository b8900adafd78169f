//! Caller identity resolution.
//!
//! # Responsibility
//! - Define the seam through which the excluded web layer hands the core an
//!   authenticated `(user_id, role)`.
//! - Resolve the session payload format (`{"userId": <int>}`) against the
//!   user table.
//!
//! # Invariants
//! - Any malformed, non-positive or unknown session resolves to `None`;
//!   resolution never fails loudly.

use crate::model::user::{Identity, UserId};
use crate::repo::user_repo::UserRepository;
use log::warn;
use serde::Deserialize;

/// Yields the identity of the current caller, `None` when unauthenticated.
pub trait IdentityProvider {
    fn current_identity(&self) -> Option<Identity>;
}

/// Fixed identity, for tests and operator tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentityProvider(pub Option<Identity>);

impl IdentityProvider for StaticIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.0
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload {
    user_id: UserId,
}

/// Resolves a raw session value against stored users.
pub struct SessionIdentityProvider<'a, R: UserRepository> {
    raw_session: Option<&'a str>,
    users: &'a R,
}

impl<'a, R: UserRepository> SessionIdentityProvider<'a, R> {
    pub fn new(raw_session: Option<&'a str>, users: &'a R) -> Self {
        Self { raw_session, users }
    }
}

impl<R: UserRepository> IdentityProvider for SessionIdentityProvider<'_, R> {
    fn current_identity(&self) -> Option<Identity> {
        let user_id = parse_session(self.raw_session?)?;
        match self.users.get_user(user_id) {
            Ok(user) => user.as_ref().map(Identity::from),
            Err(err) => {
                warn!(
                    "event=identity_resolve module=identity status=error user_id={} error={}",
                    user_id, err
                );
                None
            }
        }
    }
}

/// Extracts the user id from a session payload.
pub fn parse_session(raw: &str) -> Option<UserId> {
    let payload: SessionPayload = serde_json::from_str(raw).ok()?;
    (payload.user_id > 0).then_some(payload.user_id)
}
