//! Repository port for task, history and breach persistence.

use crate::task::domain::{
    BreachRecord, Department, HistoryEntry, HistoryPage, HistoryQuery, Task, TaskId,
    TaskStatus, TaskVersion,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Everything a single accepted transition writes.
///
/// Implementations apply a commit as one atomic unit: either the task update,
/// the history append and the breach insert (if any) all become visible, or
/// none do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    /// Task state after the transition.
    pub task: Task,
    /// Version the task had when it was loaded.
    pub expected_version: TaskVersion,
    /// History entry describing the transition.
    pub history: HistoryEntry,
    /// Breach detected for the outgoing status, inserted only if absent.
    pub breach: Option<BreachRecord>,
}

/// Filter for task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Restrict to one department.
    pub department: Option<Department>,
    /// Restrict to one status.
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    /// Restricts the listing to a department.
    #[must_use]
    pub fn with_department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    /// Restricts the listing to a status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` when `task` passes the filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.department
            .as_ref()
            .is_none_or(|department| &task.origin().department == department)
            && self.status.is_none_or(|status| task.status() == status)
    }
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a newly created task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Lists tasks matching `filter`, newest first.
    async fn list(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Lists tasks whose current status carries a deadline.
    async fn list_sla_bearing(&self) -> TaskRepositoryResult<Vec<Task>>;

    /// Atomically applies a transition.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::VersionConflict`] when its stored version
    /// differs from `expected_version`. Nothing is written on error.
    ///
    /// Returns `true` when the commit carried a breach whose occurrence was
    /// not recorded before.
    async fn commit_transition(&self, commit: &TransitionCommit) -> TaskRepositoryResult<bool>;

    /// Inserts a breach unless one already exists for the same occurrence.
    ///
    /// Returns `true` when the record was inserted.
    async fn insert_breach_if_absent(&self, breach: &BreachRecord) -> TaskRepositoryResult<bool>;

    /// Returns a page of a task's history, oldest first.
    async fn history(
        &self,
        task_id: TaskId,
        query: HistoryQuery,
    ) -> TaskRepositoryResult<HistoryPage>;

    /// Returns the newest history entries across all tasks, newest first.
    async fn recent_history(&self, limit: usize) -> TaskRepositoryResult<Vec<HistoryEntry>>;

    /// Returns every breach record, newest detection first.
    async fn list_breaches(&self) -> TaskRepositoryResult<Vec<BreachRecord>>;

    /// Returns breaches whose task still sits in the breached occurrence.
    async fn list_open_breaches(&self) -> TaskRepositoryResult<Vec<BreachRecord>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The stored task changed since it was loaded.
    #[error("task {task_id} was modified concurrently, expected version {expected}")]
    VersionConflict {
        /// Task whose write was rejected.
        task_id: TaskId,
        /// Version the writer expected.
        expected: TaskVersion,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
