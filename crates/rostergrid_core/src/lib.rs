//! Core domain logic for RosterGrid staff availability.
//! This crate is the single source of truth for interval and access invariants.

pub mod api;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod prefs;
pub mod repo;
pub mod service;

pub use calendar::format::TimeFormat;
pub use calendar::grid::{ViewerContext, WeekGrid};
pub use calendar::selection::SlotSelection;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use identity::{IdentityProvider, SessionIdentityProvider, StaticIdentityProvider};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::interval::{AvailabilityInterval, IntervalId, InvalidRange, OwnerId, TimeRange};
pub use model::user::{Identity, Role, User, UserId};
pub use prefs::PreferenceStore;
pub use repo::interval_repo::{IntervalRepository, SqliteIntervalRepository};
pub use repo::user_repo::{NewUser, SqliteUserRepository, UserDirectory, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::availability_service::{
    available_at, AvailabilityError, AvailabilityService, IntervalView,
};
pub use service::user_service::{CreateUserRequest, UserService, UserServiceError};
pub use service::week::{week_window, WeekWindow};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
