use jiff::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock in milliseconds.
    fn now_millis(&self) -> i64;

    /// Block until the clock reads strictly later than `last`, returning that reading.
    fn wait_past(&self, last: i64) -> i64 {
        loop {
            let now = self.now_millis();
            if now > last {
                return now;
            }
            std::hint::spin_loop();
        }
    }
}

/// Wall clock, milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Timestamp::now().as_millisecond()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a test can hand one clone to a generator
/// and drive time from another thread through the other. Waiting on a
/// `ManualClock` really blocks until some other handle moves it forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward by `delta` milliseconds and returns the new reading.
    pub fn advance(&self, delta: i64) -> i64 {
        self.millis.fetch_add(delta, Ordering::SeqCst) + delta
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn wait_past(&self, last: i64) -> i64 {
        loop {
            let now = self.now_millis();
            if now > last {
                return now;
            }
            std::thread::yield_now();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn system_clock_reports_millis_since_unix_epoch() {
        let before = Timestamp::now().as_millisecond();
        let now = SystemClock.now_millis();
        let after = Timestamp::now().as_millisecond();
        assert!(before <= now && now <= after);
    }

    #[test]
    fn system_clock_wait_past_returns_a_later_reading() {
        let clock = SystemClock;
        let last = clock.now_millis();
        assert!(clock.wait_past(last) > last);
    }

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualClock::new(10);
        let handle = clock.clone();

        handle.set(42);
        assert_eq!(clock.now_millis(), 42);
        assert_eq!(handle.advance(8), 50);
        assert_eq!(clock.now_millis(), 50);
    }

    #[test]
    fn manual_clock_wait_blocks_until_advanced() {
        let clock = ManualClock::new(100);
        let handle = clock.clone();

        let waiter = thread::spawn(move || clock.wait_past(100));
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        handle.set(101);
        assert_eq!(waiter.join().unwrap(), 101);
    }
}
