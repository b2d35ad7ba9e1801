//! Statistics and metrics for the fan-out core

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the broadcaster and the poller
#[derive(Debug, Default)]
pub struct BroadcastStats {
    /// `publish` calls
    published: AtomicU64,
    /// Payloads serialized (one per successful publish)
    serialized: AtomicU64,
    /// Payloads that failed to serialize
    serialization_failures: AtomicU64,
    /// Deliveries handed to dispatch tasks
    dispatched: AtomicU64,
    /// Deliveries that completed
    delivered: AtomicU64,
    /// Deliveries that failed or timed out
    delivery_failures: AtomicU64,
    /// Subscribers removed after a failed delivery
    evicted: AtomicU64,
    /// Poller ticks run
    poll_ticks: AtomicU64,
    /// Poller ticks whose store read failed
    poll_failures: AtomicU64,
    /// Poller ticks that found nothing to publish
    empty_polls: AtomicU64,
}

impl BroadcastStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_serialized(&self) {
        self.serialized.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_serialization_failure(&self) {
        self.serialization_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self, count: usize) {
        self.dispatched.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery_failure(&self, evicted: bool) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_poll_tick(&self) {
        self.poll_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            serialized: self.serialized.load(Ordering::Relaxed),
            serialization_failures: self.serialization_failures.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            poll_ticks: self.poll_ticks.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BroadcastStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub published: u64,
    pub serialized: u64,
    pub serialization_failures: u64,
    pub dispatched: u64,
    pub delivered: u64,
    pub delivery_failures: u64,
    pub evicted: u64,
    pub poll_ticks: u64,
    pub poll_failures: u64,
    pub empty_polls: u64,
}

impl StatsSnapshot {
    /// Deliveries dispatched but not yet finished
    pub fn in_flight(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.delivered + self.delivery_failures)
    }
}
