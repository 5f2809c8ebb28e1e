pub use crate::config::{Config, ConfigBuilder};
pub use crate::context::{Context, ContextKey};
pub use crate::error::{Error, Result};
pub use crate::executor::{PanicStrategy, WorkerPool};
pub use crate::task::{wait_all, BoxError, Task, TaskFailure, TaskResult, TaskState};
pub use crate::telemetry::MetricsSnapshot;
