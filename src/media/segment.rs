//! Segment type
//!
//! A segment is the opaque unit handed from the producer to every subscriber.
//! It is created once, wrapped in an `Arc`, and only the reference is cloned
//! into the rings that hold it. The payload is never inspected here.

use std::sync::Arc;

use bytes::Bytes;

/// Monotonically increasing segment identifier
pub type SegmentId = u64;

/// A segment shared between the ingest ring, the prebuffer and client rings
pub type SharedSegment = Arc<Segment>;

/// A published data segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Sequence id assigned by the producer
    pub id: SegmentId,
    /// Opaque payload (reference counted)
    pub data: Bytes,
}

impl Segment {
    /// Create a new segment
    pub fn new(id: SegmentId, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Create a shared segment ready to be ingested
    pub fn shared(id: SegmentId, data: impl Into<Bytes>) -> SharedSegment {
        Arc::new(Self::new(id, data))
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
