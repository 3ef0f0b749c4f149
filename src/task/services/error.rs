//! Service-level error taxonomy for the lifecycle engine.

use crate::task::{
    domain::{
        HistoryChainError, InvalidInputError, TaskDomainError, TaskId, TaskStatus,
        ValidationError,
    },
    ports::TaskRepositoryError,
};
use thiserror::Error;

/// Errors surfaced to callers of the lifecycle services.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The rule table rejects the requested transition.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    IllegalTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// Actor, remark or status input is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another writer changed the task between load and commit.
    #[error("task {0} was modified concurrently")]
    ConcurrentModification(TaskId),

    /// A structured complaint is missing required fields.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// The stored history of a task fails verification.
    #[error("history of task {task_id} is corrupt: {source}")]
    CorruptHistory {
        /// Task whose history failed verification.
        task_id: TaskId,
        /// Verification failure.
        source: HistoryChainError,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(TaskRepositoryError),
}

impl TaskLifecycleError {
    /// Returns `true` for transient failures the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl From<TaskDomainError> for TaskLifecycleError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::IllegalTransition { task_id, from, to } => {
                Self::IllegalTransition { task_id, from, to }
            }
            TaskDomainError::HistoryMismatch { task_id, .. } => {
                Self::ConcurrentModification(task_id)
            }
        }
    }
}

impl From<TaskRepositoryError> for TaskLifecycleError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(task_id) => Self::NotFound(task_id),
            TaskRepositoryError::VersionConflict { task_id, .. } => {
                Self::ConcurrentModification(task_id)
            }
            other => Self::Repository(other),
        }
    }
}

/// Result type for lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;
