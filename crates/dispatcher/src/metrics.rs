//! Actor metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single dispatch actor
#[derive(Debug, Default)]
pub struct ActorMetrics {
    /// Operations accepted by the loop
    accepted: AtomicU64,
    /// Operations whose completion was signalled
    completed: AtomicU64,
    /// Accepted synchronous operations
    sync_count: AtomicU64,
    /// Accepted asynchronous operations
    async_count: AtomicU64,
    /// Callbacks that panicked
    panicked: AtomicU64,
}

impl ActorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }

    /// Record an accepted operation
    pub fn inc_accepted(&self, asynchronous: bool) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        if asynchronous {
            self.async_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.sync_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Operations accepted but not yet completed
    pub fn in_flight(&self) -> u64 {
        self.accepted().saturating_sub(self.completed())
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted(),
            completed: self.completed(),
            sync_count: self.sync_count.load(Ordering::Relaxed),
            async_count: self.async_count.load(Ordering::Relaxed),
            panicked: self.panicked(),
        }
    }
}

/// Snapshot of actor metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    pub completed: u64,
    pub sync_count: u64,
    pub async_count: u64,
    pub panicked: u64,
}
