//! Metrics collection for runtime monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// One hour in nanoseconds.
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;

/// Runtime metrics collector
#[derive(Debug)]
pub struct Metrics {
    items_executed: AtomicU64,
    items_panicked: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_faulted: AtomicU64,
    tasks_panicked: AtomicU64,
    busy_time_ns: AtomicU64,

    // Time from enqueue until a worker picks the item up
    queue_wait_histogram: RwLock<Histogram<u64>>,
    execution_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            items_executed: AtomicU64::new(0),
            items_panicked: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_faulted: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            queue_wait_histogram: RwLock::new(new_histogram()),
            execution_histogram: RwLock::new(new_histogram()),
            start_time: Instant::now(),
        }
    }

    /// Record one work item run by a worker
    pub fn record_execution(&self, queue_wait: Duration, execution: Duration) {
        let execution_ns = saturating_nanos(execution);
        self.items_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(execution_ns, Ordering::Relaxed);

        // Contended samples are dropped rather than stalling a worker.
        if let Some(mut hist) = self.queue_wait_histogram.try_write() {
            let _ = hist.record(saturating_nanos(queue_wait).min(MAX_TRACKED_NS));
        }
        if let Some(mut hist) = self.execution_histogram.try_write() {
            let _ = hist.record(execution_ns.min(MAX_TRACKED_NS));
        }
    }

    pub fn record_panic(&self) {
        self.items_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_faulted(&self) {
        self.tasks_faulted.fetch_add(1, Ordering::Relaxed);
    }

    /// Tracked work or a continuation panicked. Also counted as faulted.
    pub fn record_task_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics. `items_submitted` comes from the
    /// queue, which owns that counter.
    pub fn snapshot(&self, items_submitted: u64) -> MetricsSnapshot {
        let queue_wait = self.queue_wait_histogram.read();
        let execution = self.execution_histogram.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            items_submitted,
            items_executed: self.items_executed.load(Ordering::Relaxed),
            items_panicked: self.items_panicked.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_faulted: self.tasks_faulted.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_queue_wait_ns: mean(&queue_wait),
            p99_queue_wait_ns: queue_wait.value_at_quantile(0.99),
            avg_execution_ns: mean(&execution),
            p50_execution_ns: execution.value_at_quantile(0.50),
            p99_execution_ns: execution.value_at_quantile(0.99),
            max_execution_ns: execution.max(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn new_histogram() -> Histogram<u64> {
    // 3 significant figures over [1ns, 1h] is always a valid configuration.
    Histogram::new_with_bounds(1, MAX_TRACKED_NS, 3)
        .unwrap_or_else(|_| unreachable!("static histogram bounds are valid"))
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn mean(hist: &Histogram<u64>) -> u64 {
    if hist.len() > 0 {
        hist.mean() as u64
    } else {
        0
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub items_submitted: u64,
    pub items_executed: u64,
    pub items_panicked: u64,
    pub tasks_completed: u64,
    pub tasks_faulted: u64,
    pub tasks_panicked: u64,
    pub busy_time_ns: u64,
    pub avg_queue_wait_ns: u64,
    pub p99_queue_wait_ns: u64,
    pub avg_execution_ns: u64,
    pub p50_execution_ns: u64,
    pub p99_execution_ns: u64,
    pub max_execution_ns: u64,
}

impl MetricsSnapshot {
    /// Items accepted but not yet finished by a worker.
    pub fn in_flight(&self) -> u64 {
        self.items_submitted.saturating_sub(self.items_executed)
    }
}
