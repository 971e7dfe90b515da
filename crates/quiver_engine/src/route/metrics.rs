//! In-process counters for route execution.
//!
//! Lock-free so the hot execute paths can bump them without contention. The
//! global instance lives for the process; snapshots are consistent enough
//! for observability, not for accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct RouteMetrics {
    /// Number of blocking route executions started.
    executes: AtomicU64,
    /// Number of streaming route executions started.
    stream_executes: AtomicU64,
    /// Scatter queries that returned results despite failed shards.
    partial_success_scatter: AtomicU64,
    /// Individual shard errors demoted to session warnings.
    demoted_shard_errors: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteMetricsSnapshot {
    pub executes: u64,
    pub stream_executes: u64,
    pub partial_success_scatter: u64,
    pub demoted_shard_errors: u64,
}

static GLOBAL: RouteMetrics = RouteMetrics::new();

impl RouteMetrics {
    pub const fn new() -> Self {
        RouteMetrics {
            executes: AtomicU64::new(0),
            stream_executes: AtomicU64::new(0),
            partial_success_scatter: AtomicU64::new(0),
            demoted_shard_errors: AtomicU64::new(0),
        }
    }

    /// Process-wide counters.
    pub fn global() -> &'static RouteMetrics {
        &GLOBAL
    }

    pub fn record_execute(&self) {
        self.executes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_execute(&self) {
        self.stream_executes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partial_success_scatter(&self) {
        self.partial_success_scatter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_demoted_shard_error(&self) {
        self.demoted_shard_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouteMetricsSnapshot {
        RouteMetricsSnapshot {
            executes: self.executes.load(Ordering::Relaxed),
            stream_executes: self.stream_executes.load(Ordering::Relaxed),
            partial_success_scatter: self.partial_success_scatter.load(Ordering::Relaxed),
            demoted_shard_errors: self.demoted_shard_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = RouteMetrics::new();
        metrics.record_execute();
        metrics.record_execute();
        metrics.record_partial_success_scatter();

        let snap = metrics.snapshot();
        assert_eq!(snap.executes, 2);
        assert_eq!(snap.partial_success_scatter, 1);
        assert_eq!(snap.stream_executes, 0);
    }
}
