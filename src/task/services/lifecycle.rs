//! Service layer for validated task status transitions.

use super::{
    AuditTrailRecorder, LifecycleConfig, SlaBreachDetector, TaskLifecycleError,
    TaskLifecycleResult,
};
use crate::task::{
    domain::{
        HistoryEntry, HistoryPage, HistoryQuery, Task, TaskId, TaskStatus,
        ValidationError, now_from,
    },
    ports::{TaskFilter, TaskRepository, TransitionCommit},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// Request payload for moving a task to a new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTaskRequest {
    task_id: TaskId,
    target: TaskStatus,
    actor: String,
    remark: String,
}

impl TransitionTaskRequest {
    /// Creates a request with an empty remark.
    #[must_use]
    pub fn new(task_id: TaskId, target: TaskStatus, actor: impl Into<String>) -> Self {
        Self {
            task_id,
            target,
            actor: actor.into(),
            remark: String::new(),
        }
    }

    /// Creates a request from a caller-supplied status string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownStatus`] when `target` does not name
    /// a lifecycle status.
    pub fn parse(
        task_id: TaskId,
        target: &str,
        actor: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let status = TaskStatus::try_from(target)?;
        Ok(Self::new(task_id, status, actor))
    }

    /// Sets the remark recorded with the transition.
    #[must_use]
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Returns the task to transition.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the requested status.
    #[must_use]
    pub const fn target(&self) -> TaskStatus {
        self.target
    }
}

/// Task lifecycle manager.
///
/// Every accepted transition is committed as one unit together with its
/// history entry and, when the outgoing status was overdue, its breach
/// record. Rejected transitions write nothing.
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    recorder: AuditTrailRecorder<R>,
    detector: SlaBreachDetector<R, C>,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a lifecycle service with default configuration.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self::with_config(repository, clock, LifecycleConfig::default())
    }

    /// Creates a lifecycle service with explicit configuration.
    #[must_use]
    pub fn with_config(repository: Arc<R>, clock: Arc<C>, config: LifecycleConfig) -> Self {
        Self {
            recorder: AuditTrailRecorder::new(Arc::clone(&repository), config.audit),
            detector: SlaBreachDetector::new(Arc::clone(&repository), Arc::clone(&clock)),
            repository,
            clock,
        }
    }

    /// Returns the audit trail recorder sharing this service's repository.
    #[must_use]
    pub const fn audit(&self) -> &AuditTrailRecorder<R> {
        &self.recorder
    }

    /// Returns the breach detector sharing this service's repository.
    #[must_use]
    pub const fn detector(&self) -> &SlaBreachDetector<R, C> {
        &self.detector
    }

    /// Moves a task to the requested status.
    ///
    /// The task is loaded, the move is checked against the rule table and
    /// the audit fields are validated before anything is written. The commit
    /// succeeds only if no other transition landed since the task was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks,
    /// [`TaskLifecycleError::IllegalTransition`] when the rule table rejects
    /// the move, [`TaskLifecycleError::Validation`] for malformed audit input
    /// and [`TaskLifecycleError::ConcurrentModification`] when another writer
    /// won the race.
    pub async fn transition(&self, request: TransitionTaskRequest) -> TaskLifecycleResult<Task> {
        let task = self.find_by_id(request.task_id).await?;
        let rule = task.rule_to(request.target)?;
        let recorded_at = task.transition_timestamp(now_from(&*self.clock));
        let breach = self.detector.evaluate_at(&task, recorded_at);
        let entry = self
            .recorder
            .record(&task, rule, &request.actor, &request.remark, recorded_at)?;

        let mut updated = task.clone();
        updated.apply(&entry)?;
        let commit = TransitionCommit {
            task: updated,
            expected_version: task.version(),
            history: entry,
            breach,
        };
        let breach_recorded = self
            .repository
            .commit_transition(&commit)
            .await
            .inspect_err(|err| {
                debug!(task_id = %task.id(), error = %err, "transition commit rejected");
            })?;

        if let Some(recorded) = commit.breach.as_ref().filter(|_| breach_recorded) {
            info!(
                task_id = %recorded.task_id(),
                status = %recorded.status(),
                elapsed_secs = recorded.elapsed().num_seconds(),
                "sla breach captured on transition"
            );
        }
        info!(
            task_id = %task.id(),
            from = %rule.from,
            to = %rule.to,
            actor = %commit.history.changed_by(),
            version = %commit.task.version(),
            "task transitioned"
        );
        Ok(commit.task)
    }

    /// Retrieves a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not exist.
    pub async fn find_by_id(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    /// Lists tasks matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the read fails.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.repository.list(filter).await?)
    }

    /// Returns one page of a task's history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not exist.
    pub async fn history(
        &self,
        task_id: TaskId,
        query: HistoryQuery,
    ) -> TaskLifecycleResult<HistoryPage> {
        let task = self.find_by_id(task_id).await?;
        self.recorder.history(task.id(), query).await
    }

    /// Returns the most recent transitions across all tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the read fails.
    pub async fn recent_activity(&self, limit: usize) -> TaskLifecycleResult<Vec<HistoryEntry>> {
        self.recorder.recent_activity(limit).await
    }

    /// Verifies the stored history of a task against its current state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not exist
    /// and [`TaskLifecycleError::CorruptHistory`] when verification fails.
    pub async fn verify_history(&self, task_id: TaskId) -> TaskLifecycleResult<()> {
        let task = self.find_by_id(task_id).await?;
        self.recorder.verify(&task).await
    }
}
