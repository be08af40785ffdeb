//! Status snapshot
//!
//! A point-in-time record of slot occupancy and segment positions, for an
//! external status reporter to render.

use serde::Serialize;

use crate::client::state::SlotState;
use crate::media::segment::SegmentId;

/// Slot counts per state plus segment positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub free: usize,
    pub reserved: usize,
    pub wait: usize,
    pub writable: usize,
    pub busy: usize,
    pub buffer_full: usize,
    /// Most recently published segment
    pub current_read: Option<SegmentId>,
    /// Newest segment any client has been sent
    pub newest_write: Option<SegmentId>,
    /// Oldest position among clients and the publisher
    pub oldest_write: Option<SegmentId>,
}

impl StatusSnapshot {
    /// Start a snapshot at the publisher's current position
    pub(crate) fn new(current_read: Option<SegmentId>) -> Self {
        Self {
            current_read,
            oldest_write: current_read,
            ..Default::default()
        }
    }

    /// Fold one slot into the snapshot
    pub(crate) fn record(&mut self, state: SlotState, last_delivered: Option<SegmentId>) {
        match state {
            SlotState::Free => self.free += 1,
            SlotState::Reserved => self.reserved += 1,
            SlotState::Wait => self.wait += 1,
            SlotState::Writable => self.writable += 1,
            SlotState::Busy => self.busy += 1,
            SlotState::BufferFull => self.buffer_full += 1,
        }

        if let Some(id) = last_delivered {
            self.newest_write = self.newest_write.max(Some(id));
            self.oldest_write = Some(self.oldest_write.map_or(id, |oldest| oldest.min(id)));
        }
    }

    /// Number of slots with a committed client
    pub fn live(&self) -> usize {
        self.wait + self.writable + self.busy + self.buffer_full
    }

    /// Total number of slots
    pub fn total(&self) -> usize {
        self.free + self.reserved + self.live()
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_state() {
        let mut status = StatusSnapshot::new(None);
        for state in SlotState::ALL {
            status.record(state, None);
        }
        status.record(SlotState::Free, None);

        assert_eq!(status.free, 2);
        assert_eq!(status.reserved, 1);
        assert_eq!(status.live(), 4);
        assert_eq!(status.total(), 7);
    }

    #[test]
    fn test_positions() {
        let mut status = StatusSnapshot::new(Some(20));
        status.record(SlotState::Writable, Some(15));
        status.record(SlotState::Busy, Some(18));
        status.record(SlotState::Free, None);

        assert_eq!(status.current_read, Some(20));
        assert_eq!(status.newest_write, Some(18));
        assert_eq!(status.oldest_write, Some(15));
    }

    #[test]
    fn test_positions_without_clients() {
        let status = StatusSnapshot::new(Some(5));
        assert_eq!(status.newest_write, None);
        assert_eq!(status.oldest_write, Some(5));

        let status = StatusSnapshot::new(None);
        assert_eq!(status.oldest_write, None);
    }

    #[test]
    fn test_to_json_fields() {
        let mut status = StatusSnapshot::new(Some(3));
        status.record(SlotState::BufferFull, Some(2));

        let json = status.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for field in [
            "free",
            "reserved",
            "wait",
            "writable",
            "busy",
            "buffer_full",
            "current_read",
            "newest_write",
            "oldest_write",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(value["buffer_full"], 1);
        assert_eq!(value["oldest_write"], 2);
        assert_eq!(value["newest_write"], 2);
    }
}
