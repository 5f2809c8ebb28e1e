//! weft - a small thread-pool runtime with completion-tracking tasks
//!
//! Work is queued on a fixed set of worker threads. Each submission carries an
//! immutable [`Context`] captured from the submitter, which the worker hands
//! back to the action when it runs. [`Task`] tracks the outcome of a unit of
//! work and lets callers block on it or chain follow-up work.
//!
//! # Quick Start
//!
//! ```
//! use weft_rs::prelude::*;
//!
//! const REQUEST: ContextKey<u32> = ContextKey::new("request");
//!
//! let pool = WorkerPool::new(&Config::default()).unwrap();
//! let cx = Context::new().with(REQUEST, 7);
//!
//! let task = Task::run(&pool, &cx, |cx| {
//!     assert_eq!(cx.get(&REQUEST), Some(&7));
//!     Ok(())
//! })
//! .unwrap();
//!
//! let logged = task
//!     .continue_with(&cx, |antecedent, _| {
//!         assert!(antecedent.is_completed());
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! task.wait().unwrap();
//! logged.wait().unwrap();
//! ```
//!
//! # Features
//!
//! - **Fixed worker pool**: five workers by default, one shared FIFO queue
//! - **Tasks**: exactly-once completion, blocking `wait`, chained continuations
//! - **Explicit context**: flow-scoped values travel with the work item
//! - **Panic policy**: panics in raw work are logged and counted, never lost
//! - **Metrics**: queue-wait and execution latency histograms

#![warn(missing_debug_implementations)]

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod runtime;
pub mod task;
pub mod telemetry;

pub use config::{Config, ConfigBuilder};
pub use context::{Context, ContextKey};
pub use error::{Error, Result};
pub use executor::{PanicStrategy, WorkerPool};
pub use runtime::{handle, init, init_with_config, run, shutdown, submit, Runtime};
pub use task::{wait_all, Task, TaskFailure, TaskId, TaskResult, TaskState};
