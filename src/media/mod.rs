//! Media units handled by the publisher
//!
//! The publisher does not parse payloads; it only moves `Segment`
//! references around.

pub mod segment;

pub use segment::{Segment, SegmentId, SharedSegment};
