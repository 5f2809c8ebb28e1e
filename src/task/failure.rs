use crate::executor::PanicInfo;
use std::error::Error as StdError;
use std::sync::Arc;

/// Error type accepted from tracked work.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Why a task faulted.
///
/// The failure is shared, not copied: every waiter gets the same underlying
/// error object, and [`TaskFailure::downcast_ref`] recovers its concrete type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskFailure {
    #[error("{0}")]
    Error(Arc<dyn StdError + Send + Sync + 'static>),

    #[error("task panicked: {0}")]
    Panic(PanicInfo),
}

impl TaskFailure {
    pub fn from_error<E: Into<BoxError>>(error: E) -> Self {
        TaskFailure::Error(Arc::from(error.into()))
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            TaskFailure::Error(e) => e.as_ref().downcast_ref::<E>(),
            TaskFailure::Panic(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<dyn StdError + Send + Sync + 'static>> {
        match self {
            TaskFailure::Error(e) => Some(e),
            TaskFailure::Panic(_) => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFailure::Panic(_))
    }
}
