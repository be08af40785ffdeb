//! Statistics for the publisher

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time publisher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Segments distributed by publish
    pub segments_published: u64,
    /// Fan-out deliveries into private rings
    pub segments_queued: u64,
    /// Segments dropped for slots that could not take them
    pub segments_dropped: u64,
    /// Segments replayed from the prebuffer on commit
    pub segments_replayed: u64,
    /// Segments handed to sinks by writers
    pub segments_delivered: u64,
    /// Successful commits
    pub clients_committed: u64,
    /// Disconnects of committed or reserved slots
    pub clients_disconnected: u64,
    /// Sink write or close failures
    pub sink_errors: u64,
}

impl PublisherStats {
    /// Fraction of fan-out attempts that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let attempts = self.segments_queued + self.segments_dropped;
        if attempts > 0 {
            self.segments_dropped as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

/// Lock-free counters updated on the hot path
#[derive(Debug, Default)]
pub struct StatsCounters {
    segments_published: AtomicU64,
    segments_queued: AtomicU64,
    segments_dropped: AtomicU64,
    segments_replayed: AtomicU64,
    segments_delivered: AtomicU64,
    clients_committed: AtomicU64,
    clients_disconnected: AtomicU64,
    sink_errors: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_publish(&self, queued: usize, dropped: usize) {
        self.segments_published.fetch_add(1, Ordering::Relaxed);
        self.segments_queued
            .fetch_add(queued as u64, Ordering::Relaxed);
        self.segments_dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self, replayed: usize) {
        self.clients_committed.fetch_add(1, Ordering::Relaxed);
        self.segments_replayed
            .fetch_add(replayed as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.clients_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.segments_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter
    pub fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            segments_published: self.segments_published.load(Ordering::Relaxed),
            segments_queued: self.segments_queued.load(Ordering::Relaxed),
            segments_dropped: self.segments_dropped.load(Ordering::Relaxed),
            segments_replayed: self.segments_replayed.load(Ordering::Relaxed),
            segments_delivered: self.segments_delivered.load(Ordering::Relaxed),
            clients_committed: self.clients_committed.load(Ordering::Relaxed),
            clients_disconnected: self.clients_disconnected.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
        }
    }
}
