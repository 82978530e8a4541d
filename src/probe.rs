//! Uptime-gated probe state machine.
//!
//! The probe state is never stored. Each probe request evaluates the current
//! uptime against the configured thresholds from scratch:
//!
//! ```text
//!   elapsed == 0               Starting
//!   0 < elapsed < delay        NotReady
//!   delay <= elapsed <= window Ready
//!   elapsed > window           Expired
//! ```
//!
//! Boundaries: readiness is inclusive (`elapsed >= delay` is ready) and
//! liveness is exclusive (`elapsed == window` is still alive). `Expired` wins
//! over every other state, so a delay longer than the window means the
//! instance is never ready.

use std::fmt;
use std::time::Duration;

/// Default liveness window: how long the instance is meant to live.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(120);

/// Default readiness delay: warm-up before accepting traffic.
pub const DEFAULT_READINESS_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle state derived from uptime.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeState {
    Starting,
    NotReady,
    Ready,
    Expired,
}

impl ProbeState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::NotReady => "not_ready",
            Self::Ready    => "ready",
            Self::Expired  => "expired",
        }
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two gates a probe is evaluated against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Thresholds {
    pub liveness_window: Duration,
    pub readiness_delay: Duration,
}

impl Thresholds {
    pub fn new(liveness_window: Duration, readiness_delay: Duration) -> Self {
        Self { liveness_window, readiness_delay }
    }

    /// Maps an uptime onto a [`ProbeState`].
    pub fn evaluate(&self, elapsed: Duration) -> ProbeState {
        if elapsed > self.liveness_window {
            ProbeState::Expired
        } else if elapsed >= self.readiness_delay {
            ProbeState::Ready
        } else if elapsed.is_zero() {
            ProbeState::Starting
        } else {
            ProbeState::NotReady
        }
    }

    pub fn liveness(&self, elapsed: Duration) -> Verdict {
        Verdict::from_gate(self.evaluate(elapsed) != ProbeState::Expired, elapsed)
    }

    pub fn readiness(&self, elapsed: Duration) -> Verdict {
        Verdict::from_gate(self.evaluate(elapsed) == ProbeState::Ready, elapsed)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_WINDOW, DEFAULT_READINESS_DELAY)
    }
}

/// Outcome of one probe evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    Pass,
    /// Carries the uptime at evaluation time for the response body.
    Fail { elapsed: Duration },
}

impl Verdict {
    fn from_gate(open: bool, elapsed: Duration) -> Self {
        if open { Self::Pass } else { Self::Fail { elapsed } }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Response body: `ok`, or `error: <elapsed seconds>`.
    pub fn body(&self) -> String {
        match self {
            Self::Pass => "ok".to_owned(),
            Self::Fail { elapsed } => format!("error: {}", elapsed.as_secs_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn ms(m: u64) -> Duration {
        Duration::from_millis(m)
    }

    #[test]
    fn state_walks_through_the_lifecycle() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(Duration::ZERO), ProbeState::Starting);
        assert_eq!(t.evaluate(ms(1)), ProbeState::NotReady);
        assert_eq!(t.evaluate(ms(4_999)), ProbeState::NotReady);
        assert_eq!(t.evaluate(secs(5)), ProbeState::Ready);
        assert_eq!(t.evaluate(secs(120)), ProbeState::Ready);
        assert_eq!(t.evaluate(secs(120) + Duration::from_nanos(1)), ProbeState::Expired);
        assert_eq!(t.evaluate(secs(10_000)), ProbeState::Expired);
    }

    #[test]
    fn liveness_boundary_is_exclusive() {
        let t = Thresholds::new(secs(120), secs(5));
        assert!(t.liveness(secs(119)).is_pass());
        assert!(t.liveness(secs(120)).is_pass());
        assert_eq!(t.liveness(secs(121)), Verdict::Fail { elapsed: secs(121) });
    }

    #[test]
    fn liveness_passes_while_not_ready() {
        let t = Thresholds::default();
        assert!(t.liveness(Duration::ZERO).is_pass());
        assert!(t.liveness(secs(2)).is_pass());
    }

    #[test]
    fn readiness_boundary_is_inclusive() {
        let t = Thresholds::new(secs(120), secs(5));
        assert_eq!(t.readiness(ms(4_999)), Verdict::Fail { elapsed: ms(4_999) });
        assert!(t.readiness(secs(5)).is_pass());
        assert!(t.readiness(secs(6)).is_pass());
    }

    #[test]
    fn readiness_fails_once_expired() {
        let t = Thresholds::new(secs(120), secs(5));
        assert!(!t.readiness(secs(121)).is_pass());
    }

    #[test]
    fn zero_delay_is_ready_immediately() {
        let t = Thresholds::new(secs(120), Duration::ZERO);
        assert_eq!(t.evaluate(Duration::ZERO), ProbeState::Ready);
        assert!(t.readiness(Duration::ZERO).is_pass());
    }

    #[test]
    fn zero_window_expires_after_the_first_instant() {
        let t = Thresholds::new(Duration::ZERO, Duration::ZERO);
        assert!(t.liveness(Duration::ZERO).is_pass());
        assert!(!t.liveness(ms(1)).is_pass());
    }

    #[test]
    fn delay_beyond_window_is_never_ready() {
        let t = Thresholds::new(secs(10), secs(30));
        for s in [0, 5, 10, 11, 30, 31] {
            assert!(!t.readiness(secs(s)).is_pass(), "ready at {s}s");
        }
        assert_eq!(t.evaluate(secs(10)), ProbeState::NotReady);
        assert_eq!(t.evaluate(secs(11)), ProbeState::Expired);
    }

    #[test]
    fn failure_body_embeds_elapsed_seconds() {
        assert_eq!(Verdict::Pass.body(), "ok");
        assert_eq!(Verdict::Fail { elapsed: secs(121) }.body(), "error: 121");
        assert_eq!(Verdict::Fail { elapsed: ms(250) }.body(), "error: 0.25");
        assert_eq!(Verdict::Fail { elapsed: Duration::ZERO }.body(), "error: 0");
    }

    #[test]
    fn state_names() {
        assert_eq!(ProbeState::NotReady.to_string(), "not_ready");
        assert_eq!(ProbeState::Expired.as_str(), "expired");
    }
}
