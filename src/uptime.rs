//! Process uptime.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// Records when the process started and reports how long ago that was.
///
/// The start instant is fixed at construction. [`elapsed`](Uptime::elapsed)
/// takes `&self` and never writes, so one `Uptime` can be read by every
/// request task at once.
#[derive(Clone)]
pub struct Uptime {
    started_at: Instant,
    clock: Arc<dyn Clock>,
}

impl Uptime {
    /// Starts tracking against the system clock.
    pub fn start() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Starts tracking against `clock`, taking its current instant as the start.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { started_at: clock.now(), clock }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since start. Never negative.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started_at)
    }
}

impl fmt::Debug for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uptime").field("elapsed", &self.elapsed()).finish()
    }
}
