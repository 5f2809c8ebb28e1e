use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::executor::WorkerPool;
use crate::task::{Task, TaskResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owns a worker pool built from a validated [`Config`].
#[derive(Debug)]
pub struct Runtime {
    pool: Arc<WorkerPool>,
    config: Config,
}

impl Runtime {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let pool = WorkerPool::new(&config)?;

        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn submit<F>(&self, cx: &Context, f: F) -> Result<()>
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        self.pool.submit(cx, f)
    }

    #[must_use = "dropping the task discards the only handle to its failure"]
    pub fn run<F>(&self, cx: &Context, f: F) -> Result<Task>
    where
        F: FnOnce(&Context) -> TaskResult + Send + 'static,
    {
        Task::run(&self.pool, cx, f)
    }
}

// Process-wide runtime behind the free functions. Only `init` creates it.
static GLOBAL_RUNTIME: RwLock<Option<Arc<Runtime>>> = RwLock::new(None);

pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

pub fn init_with_config(config: Config) -> Result<()> {
    let mut runtime = GLOBAL_RUNTIME.write();

    if runtime.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    *runtime = Some(Arc::new(Runtime::new(config)?));
    tracing::debug!("global runtime initialized");

    Ok(())
}

pub fn is_initialized() -> bool {
    GLOBAL_RUNTIME.read().is_some()
}

pub(crate) fn current_runtime() -> Result<Arc<Runtime>> {
    GLOBAL_RUNTIME
        .read()
        .as_ref()
        .cloned()
        .ok_or(Error::NotInitialized)
}

/// Shared handle to the global pool.
pub fn handle() -> Result<Arc<WorkerPool>> {
    current_runtime().map(|rt| rt.pool.clone())
}

/// Queues `f` on the global pool.
pub fn submit<F>(cx: &Context, f: F) -> Result<()>
where
    F: FnOnce(&Context) + Send + 'static,
{
    current_runtime()?.submit(cx, f)
}

/// Runs `f` as a task on the global pool.
#[must_use = "dropping the task discards the only handle to its failure"]
pub fn run<F>(cx: &Context, f: F) -> Result<Task>
where
    F: FnOnce(&Context) -> TaskResult + Send + 'static,
{
    current_runtime()?.run(cx, f)
}

/// Tears the global runtime down, draining queued work. A no-op when nothing
/// is initialized.
pub fn shutdown() {
    // Release the lock before joining so workers calling `submit` meanwhile
    // get `NotInitialized` instead of blocking the join.
    let runtime = GLOBAL_RUNTIME.write().take();

    if let Some(rt) = runtime {
        rt.pool.shutdown();
        tracing::debug!("global runtime shut down");
    }
}
