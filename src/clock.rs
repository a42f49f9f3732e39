use std::cell::Cell;
use std::rc::Rc;

use chrono::{Days, Local, NaiveDate};

/// Source of wall-clock time for a session.
///
/// Elapsed time is always derived from `now_ms` deltas, so callers may tick
/// late or irregularly without skewing results.
pub trait Clock {
    /// Milliseconds since the unix epoch.
    fn now_ms(&self) -> i64;
    /// The device-local calendar date.
    fn today(&self) -> NaiveDate;
}

/// Production clock backed by the local system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Hand-driven clock for tests and headless drivers.
///
/// Clones share the same underlying time, so a test can keep a handle while
/// the session owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now_ms: Rc<Cell<i64>>,
    today: Rc<Cell<NaiveDate>>,
}

impl ManualClock {
    pub fn new(now_ms: i64, today: NaiveDate) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now_ms)),
            today: Rc::new(Cell::new(today)),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    /// Moves the calendar forward without touching the millisecond clock.
    pub fn advance_days(&self, days: u64) {
        let next = self
            .today
            .get()
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX);
        self.today.set(next);
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.today.set(today);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }

    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}
