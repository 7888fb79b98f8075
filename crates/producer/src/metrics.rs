//! Producer client metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single producer client
#[derive(Debug, Default)]
pub struct ProducerMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Messages accepted into the publish queue
    enqueued: AtomicU64,
    /// Messages acknowledged by the broker
    published: AtomicU64,
    /// Publishes the broker rejected or that failed in transit
    failed: AtomicU64,
}

impl ProducerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Record a broker acknowledgement (or its absence)
    pub fn record_result(&self, success: bool) {
        if success {
            self.published.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ProducerMetricsSnapshot {
        ProducerMetricsSnapshot {
            queue_len: self.queue_len(),
            enqueued: self.enqueued(),
            published: self.published(),
            failed: self.failed(),
        }
    }
}

/// Snapshot of producer metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerMetricsSnapshot {
    pub queue_len: usize,
    pub enqueued: u64,
    pub published: u64,
    pub failed: u64,
}
