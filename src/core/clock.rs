//! Civil time in the reference deployment's time zone.

use chrono::{DateTime, FixedOffset, Utc};

/// Fixed reference offset (UTC+8). All "once per calendar day" alert
/// decisions use civil dates in this zone, regardless of where the
/// process runs.
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

/// Time source for the scheduler. Injected so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall-clock time in the reference offset.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&reference_offset())
    }
}
