//! Per-slot writer
//!
//! The writer is the only actor that moves a committed slot between
//! `WRITABLE`, `WAIT`, `BUSY` and `BUFFER_FULL`. Its contract:
//!
//! 1. Poll the private ring. Empty: go `WAIT` and sleep until fan-out wakes it
//!    or the poll interval passes.
//! 2. Otherwise flag the slot `BUSY` (or `BUFFER_FULL` if the ring is at
//!    capacity), then write the oldest segment to the sink with no core lock
//!    held. The writer holds its own handle on the sink, so a disconnect
//!    during a slow write returns at once and the sink is closed when the
//!    write comes back.
//! 3. Retire the segment, record its id as last delivered and go back to
//!    `WRITABLE` (more queued) or `WAIT` (drained).
//!
//! Every state update happens under the slot's own lock, and a slot that was
//! disconnected mid-write is left alone.
//!
//! A sink write failure disconnects the slot, unless its client has already
//! been replaced.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::media::segment::SegmentId;
use crate::publisher::context::PublisherContext;

use super::slot::WriteStart;

/// Result of a single writer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// A segment was handed to the sink
    Delivered(SegmentId),
    /// Nothing queued
    Idle,
    /// The slot has no client anymore
    Detached,
}

/// Drains one committed slot into its sink
#[derive(Debug, Clone)]
pub struct SlotWriter {
    ctx: Arc<PublisherContext>,
    slot: usize,
    /// Occupant this writer serves
    generation: u64,
}

impl SlotWriter {
    /// Create a writer for a slot
    ///
    /// The slot should be committed before the writer runs; a writer started
    /// on a slot that is not live exits immediately.
    pub fn new(ctx: Arc<PublisherContext>, slot: usize) -> Self {
        let generation = ctx.slot(slot).map(|s| s.generation()).unwrap_or_default();
        Self {
            ctx,
            slot,
            generation,
        }
    }

    /// Slot this writer drains
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Deliver at most one segment
    pub fn pump(&self) -> Result<Pump> {
        let slot = self.ctx.slot(self.slot)?;

        let segment = match slot.begin_write(self.generation) {
            WriteStart::Segment(segment) => segment,
            WriteStart::Idle => return Ok(Pump::Idle),
            WriteStart::Detached => return Ok(Pump::Detached),
        };

        let Some(sink) = slot.sink_for(self.generation) else {
            return Ok(Pump::Detached);
        };
        let written = sink.lock().write(&segment);
        self.ctx.release_sink(self.slot, sink);

        if let Err(source) = written {
            tracing::warn!(
                slot = self.slot,
                segment_id = segment.id,
                error = %source,
                "Sink write failed, disconnecting client"
            );
            self.ctx.stats_counters().record_sink_error();
            if !self.ctx.disconnect_generation(self.slot, self.generation)? {
                tracing::debug!(slot = self.slot, "Client already left");
            }
            return Err(Error::Sink {
                slot: self.slot,
                source,
            });
        }

        if !slot.complete_delivery(segment.id, Some(self.generation)) {
            return Ok(Pump::Detached);
        }

        self.ctx.stats_counters().record_delivered();
        tracing::trace!(slot = self.slot, segment_id = segment.id, "Segment delivered");
        Ok(Pump::Delivered(segment.id))
    }

    /// Drain the slot until it is disconnected or the publisher shuts down
    ///
    /// Returns the number of delivered segments.
    pub async fn run(self) -> Result<u64> {
        let slot = self.ctx.slot(self.slot)?;
        let poll_interval = self.ctx.config().writer_poll_interval;
        let mut delivered = 0u64;

        loop {
            if self.ctx.is_shutdown() {
                break;
            }

            match self.pump()? {
                Pump::Delivered(_) => {
                    delivered += 1;
                    tokio::task::yield_now().await;
                }
                Pump::Idle => {
                    tokio::select! {
                        _ = slot.notified() => {}
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
                Pump::Detached => break,
            }
        }

        tracing::debug!(slot = self.slot, delivered, "Writer stopped");
        Ok(delivered)
    }

    /// Spawn `run` on the tokio runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<u64>> {
        tokio::spawn(self.run())
    }
}
