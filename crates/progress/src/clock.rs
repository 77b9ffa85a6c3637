//! Time sources for trip tracking.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{Duration, Utc};
use travelometer_core::Time;

/// Source of the current time.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Time;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a handle kept outside a tracker can drive
/// the copy the tracker owns.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Time>>,
}

impl ManualClock {
    /// Create a clock stopped at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move the clock forward by a number of minutes.
    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }

    /// Jump to an absolute time.
    pub fn set(&self, at: Time) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        self.now.get()
    }
}
