use std::time::{Duration, Instant};

/// Elapsed-time gate for evidence captures.
///
/// The first candidate after construction is always eligible; after
/// that a candidate passes only when at least `interval` has elapsed
/// since the last capture that was actually marked. Candidates that
/// are gated do not move the baseline, so over any burst the accepted
/// set is the greedy subsequence spaced at least `interval` apart.
#[derive(Debug)]
pub struct CaptureRateLimiter {
    interval: Duration,
    last_capture: Option<Instant>,
}

impl CaptureRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_capture: None,
        }
    }

    /// Whether a capture at `now` would be allowed
    pub fn should_capture(&self, now: Instant) -> bool {
        match self.last_capture {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    /// Record a capture that actually happened at `now`
    pub fn mark_captured(&mut self, now: Instant) {
        self.last_capture = Some(now);
    }
}
