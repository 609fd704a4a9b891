use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Wall clock with millisecond resolution that never hands out the same
/// instant twice within a process, so documents ordered by creation time
/// keep their write order.
pub fn now() -> DateTime<Utc> {
    let wall = Utc::now().timestamp_millis();
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = wall.max(last + 1);
        match LAST_MILLIS.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return DateTime::from_timestamp_millis(next).unwrap_or_else(Utc::now),
            Err(actual) => last = actual,
        }
    }
}

pub fn now_millis() -> i64 {
    now().timestamp_millis()
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub type Shared = Arc<dyn Clock + Send + Sync>;

#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_never_repeat_an_instant() {
        let a = now();
        let b = now();
        let c = now();

        assert!(a < b && b < c);
    }

    #[test]
    fn should_advance_manual_clock() {
        let start = Utc::now();
        let clock = ManualClock::new(start);

        clock.advance(TimeDelta::minutes(5));

        assert_eq!(
            clock.now().timestamp_millis(),
            start.timestamp_millis() + 5 * 60 * 1000
        );
    }
}
