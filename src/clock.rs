use std::{cell::Cell, fmt, rc::Rc};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time for loans and fines
pub trait Clock: fmt::Debug {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a handle kept outside a [`Catalog`]
/// can move time for the catalog that owns the other clone.
///
/// [`Catalog`]: crate::Catalog
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Shared current instant
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock stopped at `start`
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Rc::new(Cell::new(start)) }
    }

    /// Jump to `at`
    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }

    /// Move forward by `delta`
    pub fn advance(&self, delta: TimeDelta) {
        let current = self.now.get();
        self.now.set(current.checked_add_signed(delta).unwrap_or(current));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
