//! Fixed-capacity segment ring
//!
//! `SegmentRing` is a circular FIFO of segment references with oldest-first
//! eviction. It backs the ingest queue, the prebuffer history window and
//! every client's private outbound queue.
//!
//! The ring itself is not synchronized; owners wrap it in a lock. A push into
//! a full ring is refused rather than overwriting the oldest entry, so the
//! owner decides what a full ring means (evict for the prebuffer, drop the new
//! segment for a client).

use std::sync::Arc;

use crate::media::segment::{SegmentId, SharedSegment};

/// Circular buffer of shared segments
#[derive(Debug)]
pub struct SegmentRing {
    /// Slot storage, `capacity` entries
    slots: Vec<Option<SharedSegment>>,
    /// Index of the oldest retained segment
    read: usize,
    /// Number of occupied slots
    count: usize,
}

impl SegmentRing {
    /// Create an empty ring holding at most `capacity` segments
    ///
    /// A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            read: 0,
            count: 0,
        }
    }

    /// Maximum number of segments held
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of segments currently held
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the ring is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Check if the ring is at capacity
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Append a segment behind the newest one
    ///
    /// Returns the segment back if the ring is full.
    pub fn push(&mut self, segment: SharedSegment) -> Result<(), SharedSegment> {
        if self.is_full() {
            return Err(segment);
        }

        let pos = (self.read + self.count) % self.capacity();
        self.slots[pos] = Some(segment);
        self.count += 1;
        Ok(())
    }

    /// Get the oldest segment without removing it
    pub fn peek_oldest(&self) -> Option<SharedSegment> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.read].clone()
    }

    /// Get the newest segment without removing it
    pub fn peek_newest(&self) -> Option<SharedSegment> {
        self.count.checked_sub(1).and_then(|last| self.get_at(last))
    }

    /// Remove the oldest segment
    ///
    /// The ring's reference is handed back to the caller; dropping it releases
    /// the segment if nothing else holds it.
    pub fn drop_oldest(&mut self) -> Option<SharedSegment> {
        if self.is_empty() {
            return None;
        }

        let segment = self.slots[self.read].take();
        self.read = (self.read + 1) % self.capacity();
        self.count -= 1;
        segment
    }

    /// Random access relative to the oldest segment (index 0)
    pub fn get_at(&self, index: usize) -> Option<SharedSegment> {
        if index >= self.count {
            return None;
        }
        self.slots[(self.read + index) % self.capacity()].clone()
    }

    /// Ordered copy of the held references, oldest first
    pub fn snapshot(&self) -> Vec<SharedSegment> {
        (0..self.count).filter_map(|i| self.get_at(i)).collect()
    }

    /// Ids of the held segments, oldest first
    pub fn ids(&self) -> Vec<SegmentId> {
        self.snapshot().iter().map(|s| s.id).collect()
    }

    /// Release every reference and return to the empty state
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.read = 0;
        self.count = 0;
    }

    /// Check whether the ring holds this exact segment instance
    pub fn contains(&self, segment: &SharedSegment) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|held| Arc::ptr_eq(held, segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::segment::Segment;

    fn seg(id: u64) -> SharedSegment {
        Segment::shared(id, vec![id as u8; 4])
    }

    #[test]
    fn test_new_ring_is_empty() {
        let ring = SegmentRing::with_capacity(4);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.capacity(), 4);
        assert!(ring.peek_oldest().is_none());
        assert!(ring.peek_newest().is_none());
    }

    #[test]
    fn test_zero_capacity_bumped() {
        let ring = SegmentRing::with_capacity(0);
        assert_eq!(ring.capacity(), 1);
    }

    #[test]
    fn test_push_and_peek() {
        let mut ring = SegmentRing::with_capacity(3);
        ring.push(seg(1)).unwrap();
        ring.push(seg(2)).unwrap();

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.peek_oldest().unwrap().id, 1);
        assert_eq!(ring.peek_newest().unwrap().id, 2);
    }

    #[test]
    fn test_push_full_is_refused() {
        let mut ring = SegmentRing::with_capacity(2);
        ring.push(seg(1)).unwrap();
        ring.push(seg(2)).unwrap();

        let rejected = ring.push(seg(3)).unwrap_err();
        assert_eq!(rejected.id, 3);
        assert_eq!(ring.ids(), vec![1, 2]);
    }

    #[test]
    fn test_drop_oldest_fifo() {
        let mut ring = SegmentRing::with_capacity(3);
        for id in 1..=3 {
            ring.push(seg(id)).unwrap();
        }

        assert_eq!(ring.drop_oldest().unwrap().id, 1);
        assert_eq!(ring.drop_oldest().unwrap().id, 2);
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.peek_oldest().unwrap().id, 3);
    }

    #[test]
    fn test_drop_oldest_empty() {
        let mut ring = SegmentRing::with_capacity(2);
        assert!(ring.drop_oldest().is_none());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_wraparound_keeps_order() {
        let mut ring = SegmentRing::with_capacity(3);
        let mut next = 1;
        let mut expected = 1;

        // Interleave pushes and drops so the cursor wraps several times
        for _ in 0..10 {
            while !ring.is_full() {
                ring.push(seg(next)).unwrap();
                next += 1;
            }
            for _ in 0..2 {
                assert_eq!(ring.drop_oldest().unwrap().id, expected);
                expected += 1;
            }
            assert!(ring.len() <= ring.capacity());
        }
    }

    #[test]
    fn test_get_at_relative_to_read_cursor() {
        let mut ring = SegmentRing::with_capacity(3);
        for id in 1..=3 {
            ring.push(seg(id)).unwrap();
        }
        ring.drop_oldest();
        ring.push(seg(4)).unwrap();

        assert_eq!(ring.get_at(0).unwrap().id, 2);
        assert_eq!(ring.get_at(2).unwrap().id, 4);
        assert!(ring.get_at(3).is_none());
    }

    #[test]
    fn test_drop_releases_reference() {
        let mut ring = SegmentRing::with_capacity(2);
        let s = seg(1);
        ring.push(Arc::clone(&s)).unwrap();
        assert_eq!(Arc::strong_count(&s), 2);

        drop(ring.drop_oldest());
        assert_eq!(Arc::strong_count(&s), 1);
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut ring = SegmentRing::with_capacity(4);
        let s = seg(1);
        ring.push(Arc::clone(&s)).unwrap();
        ring.push(seg(2)).unwrap();
        ring.drop_oldest();
        ring.push(Arc::clone(&s)).unwrap();

        ring.reset();

        assert!(ring.is_empty());
        assert_eq!(Arc::strong_count(&s), 1);
        ring.push(seg(9)).unwrap();
        assert_eq!(ring.get_at(0).unwrap().id, 9);
    }

    #[test]
    fn test_contains_is_identity_based() {
        let mut ring = SegmentRing::with_capacity(2);
        let s = seg(1);
        ring.push(Arc::clone(&s)).unwrap();

        assert!(ring.contains(&s));
        assert!(!ring.contains(&seg(1)));
    }
}
