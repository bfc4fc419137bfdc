//! Source of "now" in the configured fixed timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }
}

/// Offset for `hours` east of UTC, clamped to the valid range.
pub fn offset_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.clamp(-23, 23) * 3600).unwrap_or_else(|| Utc.fix())
}

/// Wall clock shifted to a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn with_offset_hours(hours: i32) -> Self {
        Self::new(offset_hours(hours))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn fixed_clock_advances() {
        let start = offset_hours(9).with_ymd_and_hms(2025, 4, 10, 23, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 4, 11).unwrap());
    }

    #[test]
    fn offsets_are_clamped() {
        assert_eq!(offset_hours(9).local_minus_utc(), 9 * 3600);
        assert_eq!(offset_hours(99).local_minus_utc(), 23 * 3600);
    }
}
