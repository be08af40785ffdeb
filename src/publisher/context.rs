//! Publisher context
//!
//! The process-wide coordinator. It owns the ingest ring, the prebuffer
//! history window and the client pool, and ties them together in `publish`.
//!
//! # Locking
//!
//! A publish cycle holds `ingest` then `prebuffer` for its whole fan-out.
//! `commit` holds `prebuffer` while it replays the window and flips the slot
//! to `WRITABLE`, so a committed client sees every segment exactly once:
//! either in the replay, or from the next fan-out, never both and never
//! neither. Slot locks are always taken after these two.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::ring::SegmentRing;
use crate::client::sink::{SegmentSink, SharedSink};
use crate::client::slot::{ClientSlot, Detached, Offer};
use crate::client::state::SlotState;
use crate::client::writer::SlotWriter;
use crate::error::{Error, Result};
use crate::media::segment::{SegmentId, SharedSegment};
use crate::stats::metrics::{PublisherStats, StatsCounters};

use super::config::PublisherConfig;
use super::pool::SlotPool;
use super::status::StatusSnapshot;

/// Producer-facing queue of undistributed segments
#[derive(Debug)]
struct IngestQueue {
    ring: SegmentRing,
    /// Last id accepted from the producer
    last_id: Option<SegmentId>,
}

/// Summary of one publish cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Segment that was distributed
    pub segment_id: SegmentId,
    /// Slots that queued it
    pub queued: usize,
    /// Live slots that had to drop it
    pub dropped: usize,
}

/// Central coordinator for segment distribution
#[derive(Debug)]
pub struct PublisherContext {
    config: PublisherConfig,
    ingest: Mutex<IngestQueue>,
    prebuffer: Mutex<SegmentRing>,
    pool: SlotPool,
    /// Id of the most recently published segment
    current_segment_id: Mutex<Option<SegmentId>>,
    shutdown: AtomicBool,
    stats: StatsCounters,
}

impl PublisherContext {
    /// Create a publisher context
    pub fn new(config: PublisherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a publisher context with default configuration
    pub fn with_defaults() -> Self {
        Self::build(PublisherConfig::default())
    }

    fn build(config: PublisherConfig) -> Self {
        Self {
            ingest: Mutex::new(IngestQueue {
                ring: SegmentRing::with_capacity(config.ingest_capacity),
                last_id: None,
            }),
            prebuffer: Mutex::new(SegmentRing::with_capacity(config.prebuffer_segments)),
            pool: SlotPool::new(config.max_clients, config.client_buffer_segments),
            current_segment_id: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            stats: StatsCounters::new(),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Producer side
    // ------------------------------------------------------------------

    /// Hand a new segment to the publisher
    ///
    /// Ids must strictly increase. The segment waits in the ingest ring until
    /// the next `publish`.
    pub fn ingest(&self, segment: SharedSegment) -> Result<()> {
        if self.is_shutdown() {
            return Err(Error::ShuttingDown);
        }

        let mut ingest = self.ingest.lock();
        if let Some(last) = ingest.last_id {
            if segment.id <= last {
                return Err(Error::NonMonotonicSegment {
                    last,
                    got: segment.id,
                });
            }
        }

        let id = segment.id;
        let capacity = ingest.ring.capacity();
        ingest
            .ring
            .push(segment)
            .map_err(|_| Error::IngestFull { capacity })?;
        ingest.last_id = Some(id);
        Ok(())
    }

    /// Distribute the oldest ingested segment
    ///
    /// Queues it on every `WRITABLE`/`WAIT` slot, drops it for `BUFFER_FULL`
    /// slots, and appends it to the prebuffer. A prebuffer that reaches
    /// capacity then gives up its oldest segment, so between cycles it holds
    /// at most `prebuffer_segments - 1`. Returns `None` when the ingest ring is
    /// empty or the publisher is shut down.
    pub fn publish(&self) -> Option<FanOut> {
        if self.is_shutdown() {
            return None;
        }

        let mut ingest = self.ingest.lock();
        let segment = ingest.ring.peek_oldest()?;
        *self.current_segment_id.lock() = Some(segment.id);

        let mut prebuffer = self.prebuffer.lock();

        let mut report = FanOut {
            segment_id: segment.id,
            queued: 0,
            dropped: 0,
        };

        for slot in self.pool.iter() {
            match slot.offer(&segment) {
                Offer::Queued => {
                    report.queued += 1;
                    slot.wake();
                }
                Offer::Dropped => {
                    report.dropped += 1;
                    tracing::warn!(
                        slot = slot.id(),
                        segment_id = segment.id,
                        "Dropping segment for client"
                    );
                }
                Offer::Skipped => {}
            }
        }

        if let Err(rejected) = prebuffer.push(Arc::clone(&segment)) {
            tracing::warn!(segment_id = rejected.id, "Prebuffer full, segment not kept");
        }
        // Slide the history window
        if prebuffer.is_full() {
            if let Some(evicted) = prebuffer.drop_oldest() {
                tracing::debug!(segment_id = evicted.id, "Dropped segment from prebuffer");
            }
        }

        ingest.ring.drop_oldest();

        self.stats.record_publish(report.queued, report.dropped);
        tracing::trace!(
            segment_id = report.segment_id,
            queued = report.queued,
            dropped = report.dropped,
            "Published segment"
        );

        Some(report)
    }

    /// Ingest a segment and publish it right away
    pub fn publish_segment(&self, segment: SharedSegment) -> Result<Option<FanOut>> {
        self.ingest(segment)?;
        Ok(self.publish())
    }

    // ------------------------------------------------------------------
    // Connection side
    // ------------------------------------------------------------------

    /// Claim a client slot for a connection being set up
    pub fn reserve(&self) -> Result<usize> {
        if self.is_shutdown() {
            return Err(Error::ShuttingDown);
        }

        let id = self.pool.reserve()?;
        // Shutdown may have swept the pool while we were claiming
        if self.is_shutdown() {
            self.abandon(id);
            return Err(Error::ShuttingDown);
        }

        tracing::debug!(slot = id, "Slot reserved");
        Ok(id)
    }

    /// Release a reservation whose connection setup failed
    pub fn cancel(&self, slot: usize) -> Result<()> {
        self.pool.cancel(slot)?;
        tracing::debug!(slot, "Reservation cancelled");
        Ok(())
    }

    /// Attach a sink to a reserved slot and replay the prebuffer into it
    ///
    /// Returns the number of replayed segments. After shutdown the
    /// reservation is released and `ShuttingDown` is returned.
    pub fn commit<S>(&self, slot: usize, sink: S) -> Result<usize>
    where
        S: SegmentSink + 'static,
    {
        let client = self.pool.get(slot)?;
        if self.is_shutdown() {
            self.abandon(slot);
            return Err(Error::ShuttingDown);
        }

        let replayed = {
            let prebuffer = self.prebuffer.lock();
            let window: Vec<SharedSegment> = (0..prebuffer.len())
                .filter_map(|i| prebuffer.get_at(i))
                .collect();
            match client.attach(Box::new(sink), &window) {
                Ok(replayed) => replayed,
                Err(_) if self.is_shutdown() => return Err(Error::ShuttingDown),
                Err(e) => return Err(e),
            }
        };

        if self.is_shutdown() {
            self.abandon(slot);
            return Err(Error::ShuttingDown);
        }

        client.wake();
        self.stats.record_commit(replayed);
        tracing::info!(slot, replayed, "Client committed");
        Ok(replayed)
    }

    /// Detach a client and return its slot to the pool
    ///
    /// A failing sink close is logged and counted but never keeps the slot
    /// from becoming reusable. On a `RESERVED` slot this acts as `cancel`.
    ///
    /// Never waits for a write in flight: the sink is closed by whichever of
    /// the slot and the writer lets go of it last.
    pub fn disconnect(&self, slot: usize) -> Result<()> {
        let detached = self.pool.get(slot)?.detach()?;
        self.finish_disconnect(slot, detached);
        Ok(())
    }

    /// Disconnect a slot only while occupant `generation` is attached
    ///
    /// Returns `false` if that occupant already left.
    pub(crate) fn disconnect_generation(&self, slot: usize, generation: u64) -> Result<bool> {
        match self.pool.get(slot)?.detach_generation(generation) {
            Some(detached) => {
                self.finish_disconnect(slot, detached);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn finish_disconnect(&self, slot: usize, (previous, sink): Detached) {
        if let Some(sink) = sink {
            self.release_sink(slot, sink);
        }

        self.pool.release(slot);
        self.stats.record_disconnect();
        tracing::info!(slot, previous = %previous, "Client disconnected");
    }

    /// Drop a sink handle, closing the sink if this was the last one
    pub(crate) fn release_sink(&self, slot: usize, sink: SharedSink) {
        let Some(sink) = Arc::into_inner(sink) else {
            return;
        };
        if let Err(e) = sink.into_inner().close() {
            self.stats.record_sink_error();
            tracing::warn!(slot, error = %e, "Failed to close client sink");
        }
    }

    /// Release a slot claimed across a shutdown
    fn abandon(&self, slot: usize) {
        let Ok(client) = self.pool.get(slot) else {
            return;
        };
        if client.state() == SlotState::Free {
            return;
        }
        if let Err(e) = self.disconnect(slot) {
            tracing::debug!(slot, error = %e, "Slot already released");
        }
    }

    /// Writer for a committed slot
    pub fn writer(self: &Arc<Self>, slot: usize) -> Result<SlotWriter> {
        self.pool.get(slot)?;
        Ok(SlotWriter::new(Arc::clone(self), slot))
    }

    // ------------------------------------------------------------------
    // Writer side
    // ------------------------------------------------------------------

    /// Oldest segment queued for a live slot
    pub fn next_segment(&self, slot: usize) -> Result<Option<SharedSegment>> {
        Ok(self.pool.get(slot)?.next_segment())
    }

    /// Retire a segment the writer has sent
    ///
    /// Returns `false` if the slot was disconnected in the meantime.
    pub fn mark_delivered(&self, slot: usize, segment_id: SegmentId) -> Result<bool> {
        let delivered = self.pool.get(slot)?.complete_delivery(segment_id, None);
        if delivered {
            self.stats.record_delivered();
        }
        Ok(delivered)
    }

    /// Move a live slot between `WRITABLE`, `WAIT`, `BUSY` and `BUFFER_FULL`
    pub fn set_writer_state(&self, slot: usize, state: SlotState) -> Result<()> {
        self.pool.get(slot)?.set_writer_state(state)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Stop publishing and detach every client
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut detached = 0;
        for slot in self.pool.iter() {
            if slot.state() == SlotState::Free {
                continue;
            }
            // Lost races with a concurrent disconnect are fine
            if self.disconnect(slot.id()).is_ok() {
                detached += 1;
            }
        }

        tracing::info!(detached, "Publisher shut down");
    }

    /// Check if shutdown has been requested
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Look up a slot
    pub fn slot(&self, slot: usize) -> Result<&ClientSlot> {
        self.pool.get(slot)
    }

    /// Liveness state of a slot
    pub fn slot_state(&self, slot: usize) -> Result<SlotState> {
        Ok(self.pool.get(slot)?.state())
    }

    /// Ordered contents of a slot's private ring
    pub fn slot_segments(&self, slot: usize) -> Result<Vec<SharedSegment>> {
        Ok(self.pool.get(slot)?.segments())
    }

    /// Number of segments queued for a slot
    pub fn slot_queue_len(&self, slot: usize) -> Result<usize> {
        Ok(self.pool.get(slot)?.queue_len())
    }

    /// Ordered contents of the prebuffer window
    pub fn prebuffer_segments(&self) -> Vec<SharedSegment> {
        self.prebuffer.lock().snapshot()
    }

    /// Number of undistributed segments
    pub fn ingest_len(&self) -> usize {
        self.ingest.lock().ring.len()
    }

    /// Id of the most recently published segment
    pub fn current_segment_id(&self) -> Option<SegmentId> {
        *self.current_segment_id.lock()
    }

    /// Number of slots in the pool
    pub fn max_clients(&self) -> usize {
        self.pool.capacity()
    }

    /// Point-in-time status for reporting
    pub fn status(&self) -> StatusSnapshot {
        let mut status = StatusSnapshot::new(self.current_segment_id());
        for slot in self.pool.iter() {
            status.record(slot.state(), slot.last_delivered());
        }
        status
    }

    /// Publisher counters
    pub fn stats(&self) -> PublisherStats {
        self.stats.snapshot()
    }

    pub(crate) fn stats_counters(&self) -> &StatsCounters {
        &self.stats
    }
}

impl Default for PublisherContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}
