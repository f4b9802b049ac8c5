//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatcher instance
///
/// Never consulted for routing.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Publishes delivered through the rule pipeline
    pipeline_count: AtomicU64,
    /// Publishes delivered as raw broadcasts
    broadcast_count: AtomicU64,
    /// Publishes that returned an error
    failure_count: AtomicU64,
    /// Failures caused by cancellation or deadline
    cancelled_count: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline_count(&self) -> u64 {
        self.pipeline_count.load(Ordering::Relaxed)
    }

    pub fn inc_pipeline_count(&self) {
        self.pipeline_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn broadcast_count(&self) -> u64 {
        self.broadcast_count.load(Ordering::Relaxed)
    }

    pub fn inc_broadcast_count(&self) {
        self.broadcast_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled_count.load(Ordering::Relaxed)
    }

    pub fn inc_cancelled_count(&self) {
        self.cancelled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pipeline_count: self.pipeline_count(),
            broadcast_count: self.broadcast_count(),
            failure_count: self.failure_count(),
            cancelled_count: self.cancelled_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub pipeline_count: u64,
    pub broadcast_count: u64,
    pub failure_count: u64,
    pub cancelled_count: u64,
}

impl MetricsSnapshot {
    /// Total publishes seen
    pub fn total(&self) -> u64 {
        self.pipeline_count + self.broadcast_count + self.failure_count
    }
}
