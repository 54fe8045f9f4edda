//! Clock
//!
//! Source of "now" for hit timestamps and window boundaries.
//! `SystemClock` is used in production; `MockClock` lets tests move time
//! explicitly.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Wall clock port
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock whose time only moves when told to.
///
/// Clones share the same time, so advancing one clone advances all of them.
///
/// ```
/// use chrono::{Duration, Utc};
/// use hitcount::clock::{Clock, MockClock};
///
/// let start = Utc::now();
/// let clock = MockClock::new(start);
/// clock.advance(Duration::days(8));
/// assert_eq!(clock.now(), start + Duration::days(8));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock();
        *time = *time + duration;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current_time.lock() = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current_time.lock()
    }
}
