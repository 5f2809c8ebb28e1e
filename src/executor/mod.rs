//! Work execution infrastructure.
//!
//! This module provides the worker pool, the blocking queue it drains, and the
//! panic policy applied to every work item.

pub mod panic_handler;
pub mod pool;
pub(crate) mod queue;
pub mod work_item;
pub mod worker;

pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::WorkerPool;
pub use work_item::WorkItemId;

pub(crate) use pool::Spawner;
pub(crate) use work_item::WorkItem;
