// worker thread loop
use super::panic_handler::PanicHandler;
use super::queue::WorkQueue;
use super::work_item::WorkItem;
use crate::telemetry::Metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug, Default)]
pub struct WorkerState {
    pub items_executed: AtomicU64,
    pub items_panicked: AtomicU64,
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
    queue: Arc<WorkQueue>,
    panic_handler: Arc<PanicHandler>,
    metrics: Arc<Metrics>,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        queue: Arc<WorkQueue>,
        panic_handler: Arc<PanicHandler>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::default()),
            queue,
            panic_handler,
            metrics,
        }
    }

    // main loop, returns once the queue is closed and drained
    pub fn run(&self) {
        tracing::debug!(worker = self.id, "worker started");

        while let Some(item) = self.queue.pop() {
            self.execute(item);
        }

        tracing::debug!(
            worker = self.id,
            executed = self.state.items_executed.load(Ordering::Relaxed),
            "worker stopped"
        );
    }

    fn execute(&self, item: WorkItem) {
        let id = item.id;
        let start = Instant::now();
        let queue_wait = start.duration_since(item.enqueued_at);
        tracing::trace!(worker = self.id, item = ?id, "running work item");

        if self.panic_handler.execute(|| item.run()).is_err() {
            self.state.items_panicked.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_panic();
        }

        self.metrics.record_execution(queue_wait, start.elapsed());
        self.state.items_executed.fetch_add(1, Ordering::Relaxed);
    }
}
