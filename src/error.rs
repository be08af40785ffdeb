//! Error types
//!
//! Flow-control conditions (a full client buffer, a dropped segment) are not
//! errors. They surface as slot state and statistics instead.

use thiserror::Error;

use crate::client::sink::SinkError;
use crate::client::state::SlotState;
use crate::media::segment::SegmentId;

/// Error type for publisher operations
#[derive(Error, Debug)]
pub enum Error {
    /// No free client slot is available
    #[error("client pool exhausted ({max} slots in use)")]
    PoolExhausted { max: usize },

    /// An operation targeted a slot that is not in the required state
    #[error("invalid transition on slot {slot}: expected {expected}, found {actual}")]
    InvalidTransition {
        slot: usize,
        expected: &'static str,
        actual: SlotState,
    },

    /// Slot index outside the pool
    #[error("slot {slot} out of range (pool size {max})")]
    SlotOutOfRange { slot: usize, max: usize },

    /// The ingest ring has no room for another undistributed segment
    #[error("ingest ring full ({capacity} segments pending)")]
    IngestFull { capacity: usize },

    /// Producer handed over a segment id that does not follow the previous one
    #[error("segment id {got} does not follow {last}")]
    NonMonotonicSegment { last: SegmentId, got: SegmentId },

    /// The publisher has been shut down
    #[error("publisher is shutting down")]
    ShuttingDown,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external sink attached to a slot failed
    #[error("sink error on slot {slot}: {source}")]
    Sink {
        slot: usize,
        #[source]
        source: SinkError,
    },
}

/// Result type for publisher operations
pub type Result<T> = std::result::Result<T, Error>;
