//! Client side of the publisher
//!
//! Provides:
//! - The slot liveness state machine
//! - The fixed-pool client slot with its private ring
//! - The sink contract for external transports
//! - The per-slot writer that drains a ring into its sink

pub mod sink;
pub mod slot;
pub mod state;
pub mod writer;

pub use sink::{ChannelSink, SegmentSink, SinkError};
pub use slot::{ClientSlot, Offer};
pub use state::SlotState;
pub use writer::{Pump, SlotWriter};
