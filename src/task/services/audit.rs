//! Audit trail recording and retrieval.

use super::{AuditLimits, TaskLifecycleError, TaskLifecycleResult};
use crate::task::{
    domain::{
        Actor, HistoryChainError, HistoryEntry, HistoryPage, HistoryQuery, NewHistoryEntry,
        Remark, Task, TaskId, TransitionRule, ValidationError, verify_chain,
    },
    ports::TaskRepository,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Builds hash-chained history entries and serves them back to readers.
///
/// Entries are sealed here but written by the repository as part of the
/// transition commit, so an entry exists if and only if its transition does.
#[derive(Clone)]
pub struct AuditTrailRecorder<R>
where
    R: TaskRepository,
{
    repository: Arc<R>,
    limits: AuditLimits,
}

impl<R> AuditTrailRecorder<R>
where
    R: TaskRepository,
{
    /// Creates a recorder reading from `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>, limits: AuditLimits) -> Self {
        Self { repository, limits }
    }

    /// Returns the configured field bounds.
    #[must_use]
    pub const fn limits(&self) -> AuditLimits {
        self.limits
    }

    /// Seals the entry describing `rule` applied to `task` at `recorded_at`.
    ///
    /// The entry is numbered after the task's current version and linked to
    /// its current history head.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the actor is blank or either field
    /// exceeds its bound.
    pub fn record(
        &self,
        task: &Task,
        rule: TransitionRule,
        actor: &str,
        remark: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<HistoryEntry, ValidationError> {
        let changed_by = Actor::new(actor, self.limits.max_actor_chars)?;
        let bounded_remark = Remark::new(remark, self.limits.max_remark_chars)?;
        Ok(HistoryEntry::seal(NewHistoryEntry {
            task_id: task.id(),
            sequence: task.version().next().value(),
            from: rule.from,
            to: rule.to,
            changed_by,
            remark: bounded_remark,
            recorded_at,
            previous_digest: task.history_head(),
        }))
    }

    /// Returns one page of a task's history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the read fails.
    pub async fn history(
        &self,
        task_id: TaskId,
        query: HistoryQuery,
    ) -> TaskLifecycleResult<HistoryPage> {
        Ok(self.repository.history(task_id, query).await?)
    }

    /// Returns a task's complete history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when a read fails.
    pub async fn full_history(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<HistoryEntry>> {
        let mut entries = Vec::new();
        let mut query = HistoryQuery::first_page();
        loop {
            let page = self.repository.history(task_id, query).await?;
            entries.extend(page.entries);
            match page.next_cursor {
                Some(cursor) => query = HistoryQuery::after(cursor),
                None => return Ok(entries),
            }
        }
    }

    /// Returns the most recent transitions across all tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the read fails.
    pub async fn recent_activity(&self, limit: usize) -> TaskLifecycleResult<Vec<HistoryEntry>> {
        Ok(self.repository.recent_history(limit).await?)
    }

    /// Verifies that the stored history of `task` is intact and ends at the
    /// task's current head.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::CorruptHistory`] when the chain is broken
    /// or does not reach the task's version and head.
    pub async fn verify(&self, task: &Task) -> TaskLifecycleResult<()> {
        let entries = self.full_history(task.id()).await?;
        let corrupt = |source| TaskLifecycleError::CorruptHistory {
            task_id: task.id(),
            source,
        };
        verify_chain(&entries).map_err(corrupt)?;

        let recorded = u64::try_from(entries.len()).unwrap_or(u64::MAX);
        let head = entries.last().map(HistoryEntry::digest);
        if recorded != task.version().value() || head != task.history_head() {
            return Err(corrupt(HistoryChainError::Truncated {
                expected: task.version().value(),
                found: recorded,
            }));
        }
        Ok(())
    }
}
