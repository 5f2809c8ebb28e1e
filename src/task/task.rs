use super::failure::{BoxError, TaskFailure};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::executor::panic_handler::catch_panic;
use crate::executor::{Spawner, WorkItem, WorkerPool};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What tracked work returns.
pub type TaskResult = std::result::Result<(), BoxError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Completed,
    Faulted,
}

/// Single-assignment handle to the outcome of some work.
///
/// A task leaves [`TaskState::Pending`] exactly once. Cloning the handle is
/// cheap and every clone observes the same outcome.
#[derive(Clone)]
pub struct Task {
    shared: Arc<Shared>,
}

struct Shared {
    id: TaskId,
    spawner: Spawner,
    inner: Mutex<Inner>,
}

struct Inner {
    outcome: Option<std::result::Result<(), TaskFailure>>,
    // Run once each by whichever thread completes the task.
    continuations: Vec<WorkItem>,
}

impl Task {
    fn new(spawner: Spawner) -> Self {
        Task {
            shared: Arc::new(Shared {
                id: TaskId::next(),
                spawner,
                inner: Mutex::new(Inner {
                    outcome: None,
                    continuations: Vec::new(),
                }),
            }),
        }
    }

    /// A task with no work attached, completed by hand through
    /// [`set_result`](Task::set_result) or
    /// [`set_exception`](Task::set_exception). Late continuations are
    /// scheduled on `pool`.
    pub fn pending(pool: &WorkerPool) -> Self {
        Task::new(pool.spawner().clone())
    }

    /// Queues `f` on `pool` and returns immediately. An `Err` returned by `f`
    /// or a panic inside it faults the task; anything else completes it.
    #[must_use = "dropping the task discards the only handle to its failure"]
    pub fn run<F>(pool: &WorkerPool, cx: &Context, f: F) -> Result<Task>
    where
        F: FnOnce(&Context) -> TaskResult + Send + 'static,
    {
        let task = Task::pending(pool);
        let target = task.clone();

        pool.spawner().submit(WorkItem::new(cx.clone(), move |cx| {
            target.finish(invoke(|| f(cx)));
        }))?;

        Ok(task)
    }

    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    pub fn set_result(&self) -> Result<()> {
        self.complete(Ok(()))
    }

    pub fn set_exception<E: Into<BoxError>>(&self, error: E) -> Result<()> {
        self.complete(Err(TaskFailure::from_error(error)))
    }

    /// Records `outcome` and then runs every pending continuation on the
    /// calling thread. Fails without touching the recorded outcome if the
    /// task already left `Pending`.
    fn complete(&self, outcome: std::result::Result<(), TaskFailure>) -> Result<()> {
        let continuations = {
            let mut inner = self.shared.inner.lock();
            if inner.outcome.is_some() {
                return Err(Error::AlreadyCompleted(self.id()));
            }

            match &outcome {
                Ok(()) => self.shared.spawner.metrics.record_task_completed(),
                Err(_) => self.shared.spawner.metrics.record_task_faulted(),
            }
            inner.outcome = Some(outcome);
            std::mem::take(&mut inner.continuations)
        };

        // The state change above is visible to anything that takes the lock,
        // so continuations run without it and may inspect this task freely.
        // Every registered item wraps its user code in `invoke`, so none of
        // them unwinds out of here.
        for continuation in continuations {
            continuation.run();
        }

        Ok(())
    }

    // Completion driven by the runtime itself; a conflict here means someone
    // completed a running task by hand.
    fn finish(&self, outcome: std::result::Result<(), TaskFailure>) {
        match &outcome {
            Err(TaskFailure::Panic(info)) => {
                self.shared.spawner.metrics.record_task_panic();
                tracing::error!(task = %self.id(), panic = %info, "tracked work panicked");
            }
            Err(failure) => {
                tracing::debug!(task = %self.id(), error = %failure, "tracked work failed");
            }
            Ok(()) => {}
        }

        if let Err(e) = self.complete(outcome) {
            tracing::error!(task = %self.id(), error = %e, "dropping outcome of finished work");
        }
    }

    /// Stores `item` as a continuation if the task is still pending, or hands
    /// it back if the task is already terminal.
    fn register(&self, item: WorkItem) -> Option<WorkItem> {
        let mut inner = self.shared.inner.lock();
        if inner.outcome.is_some() {
            return Some(item);
        }
        inner.continuations.push(item);
        None
    }

    /// Chains `f` after this task and returns a task tracking `f` itself.
    ///
    /// Registered while this task is pending, `f` runs on the thread that
    /// completes it, with `cx`. Registered afterwards, `f` is queued on the
    /// pool with `cx`. Either way it runs exactly once and receives this
    /// task so it can inspect the outcome.
    #[must_use = "dropping the task discards the only handle to its failure"]
    pub fn continue_with<F>(&self, cx: &Context, f: F) -> Result<Task>
    where
        F: FnOnce(&Task, &Context) -> TaskResult + Send + 'static,
    {
        let next = Task::new(self.shared.spawner.clone());
        let target = next.clone();
        // Weak: the item may end up in this task's own continuation list.
        let antecedent: Weak<Shared> = Arc::downgrade(&self.shared);

        let item = WorkItem::new(cx.clone(), move |cx| {
            let outcome = match antecedent.upgrade() {
                Some(shared) => invoke(|| f(&Task { shared }, cx)),
                None => Err(TaskFailure::from_error(
                    "antecedent task dropped before completing",
                )),
            };
            target.finish(outcome);
        });

        if let Some(item) = self.register(item) {
            // Queued items live outside the task, so they may hold it.
            self.shared.spawner.submit(item.holding(self.clone()))?;
        }

        Ok(next)
    }

    /// Blocks until the task is terminal and returns its outcome. A fault is
    /// handed back as the very failure that was recorded.
    pub fn wait(&self) -> std::result::Result<(), TaskFailure> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let signal = WorkItem::new(Context::new(), move |_| {
            let _ = tx.send(());
        });

        if self.register(signal).is_none() {
            // The sender stays in the continuation list until completion
            // runs it, so this only returns once the outcome is recorded.
            let _ = rx.recv();
        }

        self.outcome()
            .unwrap_or_else(|| unreachable!("task {} signalled before completing", self.id()))
    }

    /// The recorded outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<std::result::Result<(), TaskFailure>> {
        self.shared.inner.lock().outcome.clone()
    }

    pub fn state(&self) -> TaskState {
        match &self.shared.inner.lock().outcome {
            None => TaskState::Pending,
            Some(Ok(())) => TaskState::Completed,
            Some(Err(_)) => TaskState::Faulted,
        }
    }

    /// May be stale as soon as it returns if another thread is completing
    /// the task.
    pub fn is_completed(&self) -> bool {
        self.state() != TaskState::Pending
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

/// Waits for every task, even after one faults, and returns the first
/// failure in slice order.
pub fn wait_all(tasks: &[Task]) -> std::result::Result<(), TaskFailure> {
    let mut first_failure = None;
    for task in tasks {
        if let Err(failure) = task.wait() {
            if first_failure.is_none() {
                first_failure = Some(failure);
            }
        }
    }
    first_failure.map_or(Ok(()), Err)
}

fn invoke<F>(f: F) -> std::result::Result<(), TaskFailure>
where
    F: FnOnce() -> TaskResult,
{
    match catch_panic(f) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TaskFailure::from_error(e)),
        Err(panic) => Err(TaskFailure::Panic(panic)),
    }
}
