//! Completion-tracking handles for work run on a [`WorkerPool`].
//!
//! [`WorkerPool`]: crate::executor::WorkerPool

mod failure;
#[allow(clippy::module_inception)]
mod task;

pub use failure::{BoxError, TaskFailure};
pub use task::{wait_all, Task, TaskId, TaskResult, TaskState};
