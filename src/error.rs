use crate::task::TaskId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("runtime not initialized")]
    NotInitialized,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("task {0} already completed")]
    AlreadyCompleted(TaskId),

    #[error("worker pool has been shut down")]
    ShutDown,
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// True for the protocol-misuse case of completing a task twice.
    pub fn is_already_completed(&self) -> bool {
        matches!(self, Error::AlreadyCompleted(_))
    }
}
