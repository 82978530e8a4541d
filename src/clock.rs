//! Clock abstraction for time-dependent probe logic.
//!
//! Production code uses [`SystemClock`], which reads the monotonic clock.
//! Tests use [`ManualClock`] to move time forward without sleeping.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of the current instant.
///
/// Shared by every request task, so implementations must be `Send + Sync`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic process clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Starts at the instant it was created and stays there until
/// [`advance`](ManualClock::advance) or [`set_elapsed`](ManualClock::set_elapsed)
/// is called.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    /// Places the clock exactly `elapsed` after its origin.
    pub fn set_elapsed(&self, elapsed: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) = elapsed;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_stands_still() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn manual_clock_advance_accumulates() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(60));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now() - start, Duration::from_millis(60_500));
    }

    #[test]
    fn manual_clock_set_elapsed_is_absolute() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(300));
        clock.set_elapsed(Duration::from_secs(7));
        assert_eq!(clock.now() - start, Duration::from_secs(7));
    }
}
