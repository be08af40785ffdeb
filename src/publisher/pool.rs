//! Fixed client slot pool
//!
//! The slots live in a boxed slice sized once at startup and are reused in
//! place. Free positions are tracked on a stack so reserve and cancel are O(1).
//!
//! Lock order is `free -> slot control`. Nothing takes the free list while
//! holding a slot lock: a released slot is pushed back only after its own
//! reset has finished, which also keeps a new occupant from seeing leftovers.

use parking_lot::Mutex;

use crate::client::slot::ClientSlot;
use crate::client::state::SlotState;
use crate::error::{Error, Result};

/// Arena of client slots plus a free-list
#[derive(Debug)]
pub struct SlotPool {
    slots: Box<[ClientSlot]>,
    free: Mutex<Vec<usize>>,
}

impl SlotPool {
    /// Create `max_clients` free slots, each with a private ring of `ring_capacity`
    pub fn new(max_clients: usize, ring_capacity: usize) -> Self {
        let slots = (0..max_clients)
            .map(|id| ClientSlot::new(id, ring_capacity))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        // Reverse so that the lowest index is handed out first
        let free = (0..max_clients).rev().collect();

        Self {
            slots,
            free: Mutex::new(free),
        }
    }

    /// Number of slots in the pool
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots on the free-list
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Look up a slot
    pub fn get(&self, id: usize) -> Result<&ClientSlot> {
        self.slots.get(id).ok_or(Error::SlotOutOfRange {
            slot: id,
            max: self.slots.len(),
        })
    }

    /// Iterate over every slot in index order
    pub fn iter(&self) -> impl Iterator<Item = &ClientSlot> {
        self.slots.iter()
    }

    /// Claim a free slot: `FREE -> RESERVED`
    pub fn reserve(&self) -> Result<usize> {
        let mut free = self.free.lock();
        let id = free.pop().ok_or(Error::PoolExhausted {
            max: self.slots.len(),
        })?;

        // A slot on the free-list is always FREE; a failure here means the
        // pool's bookkeeping was corrupted, so the index is not put back.
        self.slots[id].try_reserve()?;
        Ok(id)
    }

    /// Give a reservation back: `RESERVED -> FREE`
    pub fn cancel(&self, id: usize) -> Result<()> {
        self.get(id)?.cancel_reservation()?;
        self.free.lock().push(id);
        Ok(())
    }

    /// Return a slot that has already been reset to `FREE`
    pub(crate) fn release(&self, id: usize) {
        debug_assert_eq!(self.slots[id].state(), SlotState::Free);
        self.free.lock().push(id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_new_pool_all_free() {
        let pool = SlotPool::new(4, 8);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.free_count(), 4);
        assert!(pool.iter().all(|s| s.state() == SlotState::Free));
        assert!(pool.iter().all(|s| s.queue_capacity() == 8));
    }

    #[test]
    fn test_reserve_lowest_first() {
        let pool = SlotPool::new(3, 4);
        assert_eq!(pool.reserve().unwrap(), 0);
        assert_eq!(pool.reserve().unwrap(), 1);
        assert_eq!(pool.get(1).unwrap().state(), SlotState::Reserved);
    }

    #[test]
    fn test_reserve_exhausted() {
        let pool = SlotPool::new(2, 4);
        pool.reserve().unwrap();
        pool.reserve().unwrap();

        assert!(matches!(
            pool.reserve(),
            Err(Error::PoolExhausted { max: 2 })
        ));
    }

    #[test]
    fn test_cancel_returns_slot() {
        let pool = SlotPool::new(1, 4);
        let id = pool.reserve().unwrap();
        pool.cancel(id).unwrap();

        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.reserve().unwrap(), id);
    }

    #[test]
    fn test_cancel_free_slot_fails() {
        let pool = SlotPool::new(2, 4);
        assert!(matches!(
            pool.cancel(1),
            Err(Error::InvalidTransition { slot: 1, .. })
        ));
        // Free-list must not gain a duplicate entry
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_get_out_of_range() {
        let pool = SlotPool::new(2, 4);
        assert!(matches!(
            pool.get(2),
            Err(Error::SlotOutOfRange { slot: 2, max: 2 })
        ));
    }

    #[test]
    fn test_concurrent_reserve_exclusive() {
        let pool = Arc::new(SlotPool::new(8, 4));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.reserve())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: HashSet<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, Err(Error::PoolExhausted { .. })))
            .count();

        assert_eq!(ids.len(), 8);
        assert_eq!(exhausted, 24);
    }
}
