//! External sink contract
//!
//! A sink is whatever transmits a client's segments (a socket writer, a muxer).
//! The core only needs to hand it segments in order and close it on disconnect.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::media::segment::SharedSegment;

/// Errors reported by a sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Sink already closed by the peer
    #[error("sink closed")]
    Closed,

    /// Any other transport-specific failure
    #[error("{0}")]
    Other(String),
}

/// Destination for one client's segments
pub trait SegmentSink: Send {
    /// Transmit a segment
    fn write(&mut self, segment: &SharedSegment) -> Result<(), SinkError>;

    /// Flush and release the transport
    fn close(&mut self) -> Result<(), SinkError>;
}

/// A sink shared between its slot and an in-flight write
///
/// Whoever drops the last handle closes the sink.
pub(crate) type SharedSink = Arc<Mutex<Box<dyn SegmentSink>>>;

impl<S: SegmentSink + ?Sized> SegmentSink for Box<S> {
    fn write(&mut self, segment: &SharedSegment) -> Result<(), SinkError> {
        (**self).write(segment)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

/// Sink that forwards segments into a tokio channel
///
/// Handy for tests and for bridging into an async transport task.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<SharedSegment>>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SharedSegment>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }
}

impl SegmentSink for ChannelSink {
    fn write(&mut self, segment: &SharedSegment) -> Result<(), SinkError> {
        let tx = self.tx.as_ref().ok_or(SinkError::Closed)?;
        tx.send(Arc::clone(segment)).map_err(|_| SinkError::Closed)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.tx.take().map(|_| ()).ok_or(SinkError::Closed)
    }
}
