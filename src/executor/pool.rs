use super::panic_handler::PanicHandler;
use super::queue::WorkQueue;
use super::work_item::WorkItem;
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::task::{Task, TaskResult};
use crate::telemetry::{Metrics, MetricsSnapshot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Fixed set of long-lived worker threads draining one shared FIFO queue.
///
/// Dropping the pool shuts it down: the queue stops accepting work, whatever
/// was already queued still runs, and every worker is joined.
pub struct WorkerPool {
    workers: Mutex<Vec<WorkerHandle>>,
    spawner: Spawner,
    panic_handler: Arc<PanicHandler>,
    shutdown: AtomicBool,
    // Held by the caller that joins the workers, so later callers block
    // until the drain is over.
    join_lock: Mutex<()>,
    num_threads: usize,
}

struct WorkerHandle {
    id: WorkerId,
    thread_id: ThreadId,
    state: Arc<WorkerState>,
    thread: Option<JoinHandle<()>>,
}

/// Cloneable enqueue side of a pool. Tasks keep one so they can schedule
/// late continuations without keeping the worker threads alive.
#[derive(Clone)]
pub(crate) struct Spawner {
    queue: Arc<WorkQueue>,
    pub(crate) metrics: Arc<Metrics>,
}

impl Spawner {
    pub fn submit(&self, item: WorkItem) -> Result<()> {
        self.queue.push(item)
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner").field("queue", &self.queue).finish()
    }
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let num_threads = config.num_threads;

        let queue = Arc::new(WorkQueue::new());
        let metrics = Arc::new(Metrics::new());
        let panic_handler = Arc::new(PanicHandler::new(config.panic_strategy));

        let pool = Self {
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            spawner: Spawner {
                queue: queue.clone(),
                metrics: metrics.clone(),
            },
            panic_handler: panic_handler.clone(),
            shutdown: AtomicBool::new(false),
            join_lock: Mutex::new(()),
            num_threads,
        };

        for id in 0..num_threads {
            let worker = Worker::new(id, queue.clone(), panic_handler.clone(), metrics.clone());
            let state = worker.state.clone();

            let mut builder = thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, id));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            // On failure `pool` is dropped here, which closes the queue and
            // joins the workers spawned so far.
            let thread = builder
                .spawn(move || worker.run())
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            pool.workers.lock().push(WorkerHandle {
                id,
                thread_id: thread.thread().id(),
                state,
                thread: Some(thread),
            });
        }

        tracing::debug!(num_threads, "worker pool started");
        Ok(pool)
    }

    /// Queues `f` to run on some worker with `cx` as its context.
    ///
    /// A panic escaping `f` is handled by the pool's [`PanicStrategy`]
    /// (logged and counted by default); it never takes a worker down.
    ///
    /// [`PanicStrategy`]: super::PanicStrategy
    pub fn submit<F>(&self, cx: &Context, f: F) -> Result<()>
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        self.spawner.submit(WorkItem::new(cx.clone(), f))
    }

    /// Queues tracked work and returns the [`Task`] observing it.
    #[must_use = "dropping the task discards the only handle to its failure"]
    pub fn spawn<F>(&self, cx: &Context, f: F) -> Result<Task>
    where
        F: FnOnce(&Context) -> TaskResult + Send + 'static,
    {
        Task::run(self, cx, f)
    }

    pub(crate) fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Items queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.spawner.queue.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.spawner.metrics.snapshot(self.spawner.queue.total_enqueued())
    }

    /// Number of work items each worker has run, indexed by worker id.
    pub fn executed_per_worker(&self) -> Vec<u64> {
        self.workers
            .lock()
            .iter()
            .map(|w| w.state.items_executed.load(Ordering::Relaxed))
            .collect()
    }

    pub fn panic_count(&self) -> usize {
        self.panic_handler.panic_count()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stops accepting work, runs what is already queued, and joins the
    /// workers. Every caller returns only after the drain is over, except a
    /// caller running on one of this pool's workers: it cannot wait for its
    /// own drain, so it closes the queue and returns.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.spawner.queue.close();

        let current = thread::current().id();
        if self.workers.lock().iter().any(|w| w.thread_id == current) {
            return;
        }

        let _joining = self.join_lock.lock();
        let handles: Vec<(WorkerId, JoinHandle<()>)> = self
            .workers
            .lock()
            .iter_mut()
            .filter_map(|w| w.thread.take().map(|t| (w.id, t)))
            .collect();

        if handles.is_empty() {
            return;
        }

        for (id, handle) in handles {
            if handle.join().is_err() {
                tracing::error!(worker = id, "worker thread terminated abnormally");
            }
        }

        tracing::debug!("worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("pending", &self.pending())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
