//! Client slot state machine
//!
//! ```text
//!            reserve            commit
//!   FREE ───────────► RESERVED ───────► WRITABLE ◄──► WAIT
//!    ▲  ◄───────────     │                 ▲ │
//!    │      cancel       │                 │ ▼
//!    │                   │        BUFFER_FULL ◄──► BUSY
//!    └───── disconnect ──┴─────────── (any live state)
//! ```
//!
//! The core owns `FREE`, `RESERVED` and the entry into `WRITABLE`. Movement
//! among the live states belongs to the slot's writer.

use std::fmt;

/// Liveness state of a client slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotState {
    /// Unoccupied, available for reservation
    #[default]
    Free,
    /// Held by an in-progress connection setup
    Reserved,
    /// Writer idle, ready to drain
    Writable,
    /// Writer has nothing queued
    Wait,
    /// Writer is transmitting a segment
    Busy,
    /// Private ring at capacity, new segments are dropped
    BufferFull,
}

impl SlotState {
    /// All states, in status report order
    pub const ALL: [SlotState; 6] = [
        SlotState::Free,
        SlotState::Reserved,
        SlotState::Wait,
        SlotState::Writable,
        SlotState::Busy,
        SlotState::BufferFull,
    ];

    /// Upper-case name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotState::Free => "FREE",
            SlotState::Reserved => "RESERVED",
            SlotState::Writable => "WRITABLE",
            SlotState::Wait => "WAIT",
            SlotState::Busy => "BUSY",
            SlotState::BufferFull => "BUFFER_FULL",
        }
    }

    /// Slot has a committed client attached
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SlotState::Writable | SlotState::Wait | SlotState::Busy | SlotState::BufferFull
        )
    }

    /// Fan-out pushes new segments into this slot
    #[inline]
    pub fn accepts_segments(&self) -> bool {
        matches!(self, SlotState::Writable | SlotState::Wait)
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
