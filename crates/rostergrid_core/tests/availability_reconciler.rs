use chrono::{Duration, NaiveDate, NaiveDateTime};
use rostergrid_core::db::{open_db, open_db_in_memory};
use rostergrid_core::{
    available_at, week_window, AvailabilityError, AvailabilityService, FixedClock, Identity,
    IntervalRepository, NewUser, Role, SqliteIntervalRepository, SqliteUserRepository,
    StaticIdentityProvider, UserRepository, WeekWindow,
};
use rusqlite::Connection;

type SqliteService<'conn> =
    AvailabilityService<SqliteIntervalRepository<'conn>, SqliteUserRepository<'conn>, FixedClock>;

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .expect("fixture date should be valid")
        .and_hms_opt(hour, minute, 0)
        .expect("fixture time should be valid")
}

fn seed_user(conn: &Connection, name: &str) -> i64 {
    let users = SqliteUserRepository::try_new(conn).expect("repository should open");
    users
        .create_user(&NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: Role::User,
        })
        .expect("user should be created")
        .id
}

fn service(conn: &Connection, now: NaiveDateTime) -> SqliteService<'_> {
    AvailabilityService::new(
        SqliteIntervalRepository::try_new(conn).expect("repository should open"),
        SqliteUserRepository::try_new(conn).expect("repository should open"),
        FixedClock(now),
    )
}

fn june_week() -> WeekWindow {
    week_window(at(12, 0, 0)).expect("june week should be representable")
}

#[test]
fn set_replaces_partially_overlapping_interval() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));

    let old = service
        .set_availability(ava, at(10, 10, 0), at(10, 12, 0))
        .expect("set should succeed");
    let new = service
        .set_availability(ava, at(10, 11, 0), at(10, 13, 0))
        .expect("set should succeed");
    assert_ne!(old.id, new.id);

    let stored = service
        .find_overlapping(june_week().start(), june_week().end())
        .expect("window query should succeed");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].start(), at(10, 11, 0));
    assert_eq!(stored[0].end(), at(10, 13, 0));
}

#[test]
fn set_deletes_whole_intervals_without_trimming() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));

    service.set_availability(ava, at(10, 8, 0), at(10, 18, 0)).expect("set should succeed");
    service.set_availability(ava, at(10, 12, 0), at(10, 13, 0)).expect("set should succeed");

    let stored = service
        .find_overlapping(june_week().start(), june_week().end())
        .expect("window query should succeed");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].start(), at(10, 12, 0));
    assert_eq!(stored[0].end(), at(10, 13, 0));
}

#[test]
fn set_leaves_other_owners_and_adjacent_blocks_alone() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let ben = seed_user(&conn, "Ben");
    let service = service(&conn, at(10, 8, 0));

    service.set_availability(ben, at(10, 9, 0), at(10, 17, 0)).expect("set should succeed");
    service.set_availability(ava, at(10, 7, 0), at(10, 9, 0)).expect("set should succeed");
    service.set_availability(ava, at(10, 9, 0), at(10, 17, 0)).expect("set should succeed");

    let owners: Vec<i64> = service
        .find_overlapping(june_week().start(), june_week().end())
        .expect("window query should succeed")
        .iter()
        .map(|interval| interval.owner_id)
        .collect();
    assert_eq!(owners, vec![ava, ben, ava]);
}

#[test]
fn zero_length_set_fails_with_invalid_range() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));

    let err = service
        .set_availability(ava, at(10, 9, 0), at(10, 9, 0))
        .expect_err("zero-length range should be rejected");
    assert!(matches!(err, AvailabilityError::InvalidRange(_)));
    assert!(service
        .find_overlapping(june_week().start(), june_week().end())
        .expect("window query should succeed")
        .is_empty());
}

#[test]
fn clear_is_idempotent() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));

    service.set_availability(ava, at(10, 9, 0), at(10, 12, 0)).expect("set should succeed");
    let kept = service
        .set_availability(ava, at(11, 9, 0), at(11, 12, 0))
        .expect("set should succeed");

    assert_eq!(
        service
            .clear_availability(ava, at(10, 11, 0), at(10, 12, 0))
            .expect("clear should succeed"),
        1
    );
    let after_first = service
        .find_overlapping(june_week().start(), june_week().end())
        .expect("window query should succeed");
    assert_eq!(
        service
            .clear_availability(ava, at(10, 11, 0), at(10, 12, 0))
            .expect("clear should succeed"),
        0
    );
    let after_second = service
        .find_overlapping(june_week().start(), june_week().end())
        .expect("window query should succeed");

    assert_eq!(after_first, vec![kept]);
    assert_eq!(after_first, after_second);
}

#[test]
fn clear_with_inverted_range_is_acknowledged_noop() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));
    service.set_availability(ava, at(10, 9, 0), at(10, 12, 0)).expect("set should succeed");

    assert_eq!(
        service
            .clear_availability(ava, at(10, 12, 0), at(10, 9, 0))
            .expect("clear should succeed"),
        0
    );
    assert_eq!(
        service
            .find_overlapping(june_week().start(), june_week().end())
            .expect("window query should succeed")
            .len(),
        1
    );
}

#[test]
fn clear_inside_one_millisecond_leaves_blocks_alone() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));
    service
        .set_availability(ava, at(10, 9, 0), at(10, 12, 0))
        .expect("set should succeed");

    let removed = service
        .clear_availability(
            ava,
            at(10, 10, 0) + Duration::microseconds(100),
            at(10, 10, 0) + Duration::microseconds(900),
        )
        .expect("clear should succeed");
    assert_eq!(removed, 0);
    assert_eq!(
        service
            .find_overlapping(june_week().start(), june_week().end())
            .expect("window query should succeed")
            .len(),
        1
    );
}

#[test]
fn monday_shift_scenario() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 12, 0));

    let created = service
        .set_availability(ava, at(10, 9, 0), at(10, 17, 0))
        .expect("set should succeed");
    let found = service
        .find_overlapping(at(9, 0, 0), at(16, 0, 0))
        .expect("window query should succeed");
    assert_eq!(found, vec![created]);

    assert_eq!(available_at(at(10, 12, 0), &found).len(), 1);
    assert!(available_at(at(10, 18, 0), &found).is_empty());
}

#[test]
fn list_week_enriches_owner_names() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let ben = seed_user(&conn, "Ben");
    let service = service(&conn, at(10, 12, 0));

    service.set_availability(ben, at(10, 8, 0), at(10, 10, 0)).expect("set should succeed");
    service.set_availability(ava, at(10, 9, 0), at(10, 17, 0)).expect("set should succeed");
    service.set_availability(ava, at(17, 9, 0), at(17, 17, 0)).expect("set should succeed");

    let views = service.list_week(june_week()).expect("week listing should succeed");
    let labels: Vec<(&str, NaiveDateTime)> = views
        .iter()
        .map(|view| (view.owner_name.as_str(), view.start()))
        .collect();
    assert_eq!(labels, vec![("Ben", at(10, 8, 0)), ("Ava", at(10, 9, 0))]);

    let present = service.available_now(june_week()).expect("available-now query should succeed");
    assert_eq!(present.len(), 1);
    assert_eq!(present[0].owner_id, ava);
}

#[test]
fn list_week_reports_interval_with_missing_owner() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    conn.pragma_update(None, "foreign_keys", "OFF").expect("pragma should apply");
    let repo = SqliteIntervalRepository::try_new(&conn).expect("repository should open");
    repo.insert(77, at(10, 9, 0), at(10, 10, 0)).expect("insert should succeed");

    let err = service(&conn, at(10, 9, 0))
        .list_week(june_week())
        .expect_err("orphaned interval should be reported");
    assert!(matches!(err, AvailabilityError::InconsistentState(_)));
}

#[test]
fn caller_variants_require_identity() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let ava = seed_user(&conn, "Ava");
    let service = service(&conn, at(10, 8, 0));

    let anonymous = StaticIdentityProvider(None);
    let err = service
        .set_for_caller(&anonymous, at(10, 9, 0), at(10, 10, 0))
        .expect_err("anonymous write should be refused");
    assert!(matches!(err, AvailabilityError::NotAuthenticated));
    let err = service
        .clear_for_caller(&anonymous, at(10, 9, 0), at(10, 10, 0))
        .expect_err("anonymous clear should be refused");
    assert!(matches!(err, AvailabilityError::NotAuthenticated));

    let caller = StaticIdentityProvider(Some(Identity {
        user_id: ava,
        role: Role::User,
    }));
    let created = service
        .set_for_caller(&caller, at(10, 9, 0), at(10, 10, 0))
        .expect("caller write should succeed");
    assert_eq!(created.owner_id, ava);
}

#[test]
fn concurrent_writers_for_same_owner_leave_one_interval() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("concurrent.db");
    let owner = {
        let conn = open_db(&path).expect("db file should open");
        seed_user(&conn, "Ava")
    };

    std::thread::scope(|scope| {
        for (start_hour, end_hour) in [(9, 12), (10, 13)] {
            let path = &path;
            scope.spawn(move || {
                let conn = open_db(path).expect("db file should open");
                let service = service(&conn, at(10, 8, 0));
                for _ in 0..25 {
                    service
                        .set_availability(owner, at(10, start_hour, 0), at(10, end_hour, 0))
                        .expect("set should succeed");
                }
            });
        }
    });

    let conn = open_db(&path).expect("db file should open");
    let repo = SqliteIntervalRepository::try_new(&conn).expect("repository should open");
    let stored = repo.list_for_owner(owner).expect("owner listing should succeed");
    assert_eq!(stored.len(), 1);
}
