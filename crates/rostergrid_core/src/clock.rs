//! Injected "current time" capability.
//!
//! Availability-now and grid highlighting read time only through [`Clock`],
//! so tests pin instants with [`FixedClock`].

use chrono::{Local, NaiveDateTime};

/// Source of the current local wall-clock instant.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Host local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
