use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

/// Presence state of the monitored scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No target currently in view
    Unlocked,
    /// At least one target in view
    Locked,
}

/// Kind of security event emitted on a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Target appeared in an unlocked scene
    Acquired,
    /// All targets left a locked scene
    Lost,
}

/// A presence transition, stamped with a sortable event id
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    /// Timestamp-derived id, `YYYYMMDD_HHMMSS_mmm`
    pub event_id: String,
    pub kind: EventKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<chrono::Utc>,
}

/// Format a timestamp as an event id
pub fn format_event_id(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Two-state presence tracker.
///
/// Emits exactly one event per transition: `Acquired` on the first
/// non-empty frame while unlocked, `Lost` on the first empty frame
/// while locked. Consecutive frames with the same verdict emit
/// nothing, so emitted events strictly alternate. A single empty
/// frame clears the lock; there is no smoothing window, the capture
/// interval is the knob for noisy scenes.
#[derive(Debug)]
pub struct PresenceTracker {
    state: PresenceState,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            state: PresenceState::Unlocked,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Feed one frame verdict; returns the transition event, if any
    pub fn observe(&mut self, present: bool, now: DateTime<Local>) -> Option<SecurityEvent> {
        let kind = match (self.state, present) {
            (PresenceState::Unlocked, true) => {
                self.state = PresenceState::Locked;
                EventKind::Acquired
            }
            (PresenceState::Locked, false) => {
                self.state = PresenceState::Unlocked;
                EventKind::Lost
            }
            _ => return None,
        };

        let event = SecurityEvent {
            event_id: format_event_id(now),
            kind,
            timestamp: now.with_timezone(&chrono::Utc),
        };
        debug!("Presence transition: {:?} ({})", event.kind, event.event_id);
        Some(event)
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, millis: u32) -> DateTime<Local> {
        Local
            .timestamp_opt(1_700_000_000 + secs, millis * 1_000_000)
            .single()
            .unwrap()
    }

    #[test]
    fn test_initial_state_is_unlocked() {
        let tracker = PresenceTracker::new();
        assert_eq!(tracker.state(), PresenceState::Unlocked);
    }

    #[test]
    fn test_acquired_on_first_presence() {
        let mut tracker = PresenceTracker::new();
        let event = tracker.observe(true, at(0, 0)).unwrap();
        assert_eq!(event.kind, EventKind::Acquired);
        assert_eq!(tracker.state(), PresenceState::Locked);
    }

    #[test]
    fn test_sustained_presence_emits_once() {
        let mut tracker = PresenceTracker::new();
        assert!(tracker.observe(true, at(0, 0)).is_some());
        for i in 1..10 {
            assert!(tracker.observe(true, at(i, 0)).is_none());
        }
        assert_eq!(tracker.state(), PresenceState::Locked);
    }

    #[test]
    fn test_single_empty_frame_clears_lock() {
        let mut tracker = PresenceTracker::new();
        tracker.observe(true, at(0, 0));
        let event = tracker.observe(false, at(1, 0)).unwrap();
        assert_eq!(event.kind, EventKind::Lost);
        assert_eq!(tracker.state(), PresenceState::Unlocked);
    }

    #[test]
    fn test_events_strictly_alternate() {
        let mut tracker = PresenceTracker::new();
        let verdicts = [true, true, false, false, true, false, true, true, true, false];

        let mut kinds = Vec::new();
        for (i, &present) in verdicts.iter().enumerate() {
            if let Some(event) = tracker.observe(present, at(i as i64, 0)) {
                kinds.push(event.kind);
            }
        }

        assert!(!kinds.is_empty());
        assert_eq!(kinds[0], EventKind::Acquired);
        for pair in kinds.windows(2) {
            assert_ne!(pair[0], pair[1], "consecutive events must alternate");
        }
    }

    #[test]
    fn test_absence_while_unlocked_is_silent() {
        let mut tracker = PresenceTracker::new();
        for i in 0..5 {
            assert!(tracker.observe(false, at(i, 0)).is_none());
        }
        assert_eq!(tracker.state(), PresenceState::Unlocked);
    }

    #[test]
    fn test_event_id_format() {
        let stamp = at(0, 42);
        let id = format_event_id(stamp);
        assert_eq!(id.len(), "YYYYMMDD_HHMMSS_mmm".len());
        assert_eq!(id, stamp.format("%Y%m%d_%H%M%S_%3f").to_string());
        assert!(id.ends_with("042"));
    }
}
