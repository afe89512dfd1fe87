//! Scheduler error types.

use thiserror::Error;

/// Errors reported by the task scheduler.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Thread pool needs at least one worker thread")]
    ZeroThreads,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Task is already queued")]
    AlreadyQueued,

    #[error("Thread pool has exited")]
    PoolExited,

    #[error("Task cannot depend on itself")]
    SelfDependency,

    #[error("Dependencies must be declared before the task is submitted")]
    AlreadySubmitted,

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(usize),
}

/// Result alias for scheduler operations.
pub type TaskResult<T> = Result<T, TaskError>;
