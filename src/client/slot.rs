//! Client slot
//!
//! One slot per position in the fixed client pool. A slot is reset and reused
//! in place between occupants; it is never allocated or freed at runtime.
//!
//! # Locking
//!
//! Every read or write of the liveness state goes through `control`. The
//! private ring has its own lock and is only ever taken while `control` is
//! held, so the lock order is `control -> ring`. The sink lock is never held
//! while taking `control`, and never across a write: the writer clones the
//! sink handle out and writes through it, so a disconnect only has to swap the
//! handle out of the slot.
//!
//! Holding `control` across the fan-out push means that once a disconnect has
//! moved the slot to `FREE`, no later push can land in the ring.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::buffer::ring::SegmentRing;
use crate::error::{Error, Result};
use crate::media::segment::{SegmentId, SharedSegment};

use super::sink::{SegmentSink, SharedSink};
use super::state::SlotState;

/// Outcome of offering a segment to a slot during fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Appended to the private ring
    Queued,
    /// Slot is live but could not take the segment
    Dropped,
    /// Slot is not eligible for this cycle
    Skipped,
}

/// What the writer should do next
#[derive(Debug, Clone)]
pub(crate) enum WriteStart {
    /// Transmit this segment
    Segment(SharedSegment),
    /// Nothing queued, slot moved to `WAIT`
    Idle,
    /// Slot no longer has a client
    Detached,
}

/// Previous state and sink of a detached occupant
pub(crate) type Detached = (SlotState, Option<SharedSink>);

/// State guarded by the per-slot lock
#[derive(Debug, Default)]
struct SlotControl {
    state: SlotState,
    last_delivered: Option<SegmentId>,
    /// Bumped on every commit so a writer never acts for a later occupant
    generation: u64,
}

/// A subscriber position in the client pool
pub struct ClientSlot {
    id: usize,
    control: Mutex<SlotControl>,
    ring: Mutex<SegmentRing>,
    /// Attached sink, tagged with the generation it was committed under
    sink: Mutex<Option<(u64, SharedSink)>>,
    notify: Notify,
}

impl std::fmt::Debug for ClientSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSlot")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("queued", &self.queue_len())
            .finish()
    }
}

impl ClientSlot {
    /// Create a free slot with a private ring of `capacity` segments
    pub fn new(id: usize, capacity: usize) -> Self {
        Self {
            id,
            control: Mutex::new(SlotControl::default()),
            ring: Mutex::new(SegmentRing::with_capacity(capacity)),
            sink: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Position of this slot in the pool
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current liveness state
    pub fn state(&self) -> SlotState {
        self.control.lock().state
    }

    /// Id of the last segment the writer handed to the sink
    pub fn last_delivered(&self) -> Option<SegmentId> {
        self.control.lock().last_delivered
    }

    /// Occupant counter, incremented by each commit
    pub fn generation(&self) -> u64 {
        self.control.lock().generation
    }

    /// Number of segments waiting in the private ring
    pub fn queue_len(&self) -> usize {
        self.ring.lock().len()
    }

    /// Capacity of the private ring
    pub fn queue_capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Ordered copy of the private ring, oldest first
    pub fn segments(&self) -> Vec<SharedSegment> {
        self.ring.lock().snapshot()
    }

    /// Wait until fan-out queues something or the slot is detached
    pub async fn notified(&self) {
        self.notify.notified().await
    }

    pub(crate) fn wake(&self) {
        self.notify.notify_one();
    }

    fn invalid(&self, expected: &'static str, actual: SlotState) -> Error {
        tracing::error!(
            slot = self.id,
            expected,
            actual = %actual,
            "Invalid slot transition"
        );
        Error::InvalidTransition {
            slot: self.id,
            expected,
            actual,
        }
    }

    /// `FREE -> RESERVED` as a single check-and-set
    pub(crate) fn try_reserve(&self) -> Result<()> {
        let mut control = self.control.lock();
        if control.state != SlotState::Free {
            return Err(self.invalid("FREE", control.state));
        }
        control.state = SlotState::Reserved;
        Ok(())
    }

    /// `RESERVED -> FREE`
    pub(crate) fn cancel_reservation(&self) -> Result<()> {
        let mut control = self.control.lock();
        if control.state != SlotState::Reserved {
            return Err(self.invalid("RESERVED", control.state));
        }
        control.state = SlotState::Free;
        Ok(())
    }

    /// `RESERVED -> WRITABLE`: attach the sink and queue the replay window
    ///
    /// Returns the number of replayed segments.
    pub(crate) fn attach(
        &self,
        sink: Box<dyn SegmentSink>,
        replay: &[SharedSegment],
    ) -> Result<usize> {
        let mut control = self.control.lock();
        if control.state != SlotState::Reserved {
            return Err(self.invalid("RESERVED", control.state));
        }

        control.generation += 1;
        *self.sink.lock() = Some((control.generation, Arc::new(Mutex::new(sink))));

        let mut ring = self.ring.lock();
        let mut replayed = 0;
        for segment in replay {
            if ring.push(Arc::clone(segment)).is_err() {
                break;
            }
            replayed += 1;
        }

        control.state = SlotState::Writable;
        Ok(replayed)
    }

    /// Fan-out entry point
    pub(crate) fn offer(&self, segment: &SharedSegment) -> Offer {
        let control = self.control.lock();
        match control.state {
            SlotState::BufferFull => Offer::Dropped,
            SlotState::Wait | SlotState::Writable => {
                match self.ring.lock().push(Arc::clone(segment)) {
                    Ok(()) => Offer::Queued,
                    Err(_) => Offer::Dropped,
                }
            }
            SlotState::Free | SlotState::Reserved | SlotState::Busy => Offer::Skipped,
        }
    }

    /// `any -> FREE`
    ///
    /// Returns the previous state and the detached sink. The ring is cleared
    /// after the state change, so no fan-out push can follow the reset.
    pub(crate) fn detach(&self) -> Result<Detached> {
        let control = self.control.lock();
        if control.state == SlotState::Free {
            return Err(self.invalid("RESERVED or live", control.state));
        }
        Ok(self.reset(control))
    }

    /// `live -> FREE`, only while occupant `generation` is still attached
    ///
    /// Returns `None` if that occupant already left.
    pub(crate) fn detach_generation(&self, generation: u64) -> Option<Detached> {
        let control = self.control.lock();
        if !control.state.is_live() || control.generation != generation {
            return None;
        }
        Some(self.reset(control))
    }

    fn reset(&self, mut control: MutexGuard<'_, SlotControl>) -> Detached {
        let previous = control.state;
        control.state = SlotState::Free;
        control.last_delivered = None;
        drop(control);

        let sink = self.sink.lock().take().map(|(_, sink)| sink);
        self.ring.lock().reset();
        self.wake();

        (previous, sink)
    }

    /// Move between the writer-driven states
    pub(crate) fn set_writer_state(&self, state: SlotState) -> Result<()> {
        let mut control = self.control.lock();
        if !state.is_live() {
            return Err(self.invalid("a live target state", state));
        }
        if !control.state.is_live() {
            return Err(self.invalid("live", control.state));
        }
        control.state = state;
        Ok(())
    }

    /// Oldest queued segment, if the slot is live
    pub(crate) fn next_segment(&self) -> Option<SharedSegment> {
        let control = self.control.lock();
        if !control.state.is_live() {
            return None;
        }
        self.ring.lock().peek_oldest()
    }

    /// Writer step one: pick the oldest segment and flag the slot
    ///
    /// A full ring moves the slot to `BUFFER_FULL`; otherwise it goes `BUSY`
    /// for the duration of the write.
    pub(crate) fn begin_write(&self, generation: u64) -> WriteStart {
        let mut control = self.control.lock();
        if !control.state.is_live() || control.generation != generation {
            return WriteStart::Detached;
        }

        let ring = self.ring.lock();
        match ring.peek_oldest() {
            None => {
                control.state = SlotState::Wait;
                WriteStart::Idle
            }
            Some(segment) => {
                control.state = if ring.is_full() {
                    SlotState::BufferFull
                } else {
                    SlotState::Busy
                };
                WriteStart::Segment(segment)
            }
        }
    }

    /// Handle on the sink of occupant `generation`, if it is still attached
    pub(crate) fn sink_for(&self, generation: u64) -> Option<SharedSink> {
        match self.sink.lock().as_ref() {
            Some((attached, sink)) if *attached == generation => Some(Arc::clone(sink)),
            _ => None,
        }
    }

    /// Writer step two: retire a delivered segment
    ///
    /// With a `generation`, only the occupant it names is touched. Returns
    /// `false` if the slot was detached while writing.
    pub(crate) fn complete_delivery(&self, id: SegmentId, generation: Option<u64>) -> bool {
        let mut control = self.control.lock();
        if !control.state.is_live() || generation.is_some_and(|g| g != control.generation) {
            return false;
        }

        let mut ring = self.ring.lock();
        if ring.peek_oldest().is_some_and(|s| s.id == id) {
            ring.drop_oldest();
        }
        control.last_delivered = Some(id);
        control.state = if ring.is_empty() {
            SlotState::Wait
        } else {
            SlotState::Writable
        };
        true
    }
}
