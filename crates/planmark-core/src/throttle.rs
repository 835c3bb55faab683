//! Time-based throttling for pointer-driven updates.

// Use web_time for WASM compatibility
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};
#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};

/// Lets an action run at most once per interval.
///
/// Throttled calls are not queued: callers keep the latest input themselves
/// and act on it once the window has elapsed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true (and starts a new window) if the action may run at `now`.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Forget the current window so the next call runs immediately.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
