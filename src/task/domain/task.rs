//! Task aggregate root.

use super::{
    ComplaintOrigin, HistoryDigest, HistoryEntry, TaskDomainError, TaskId, TaskStatus,
    TaskVersion, TransitionRule,
};
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Precision kept for all lifecycle timestamps, matching `PostgreSQL`
/// `timestamptz` so values survive a storage round trip unchanged.
const TIMESTAMP_DIGITS: u16 = 6;

/// Reads the clock at storage precision.
pub(crate) fn now_from(clock: &impl Clock) -> DateTime<Utc> {
    clock.utc().trunc_subsecs(TIMESTAMP_DIGITS)
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    origin: ComplaintOrigin,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    status_entered_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    version: TaskVersion,
    history_head: Option<HistoryDigest>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted complaint origin.
    pub origin: ComplaintOrigin,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Time the persisted status began.
    pub status_entered_at: DateTime<Utc>,
    /// Deadline for the persisted status, if it carries a service level.
    pub deadline: Option<DateTime<Utc>>,
    /// Persisted optimistic concurrency version.
    pub version: TaskVersion,
    /// Digest of the newest history entry.
    pub history_head: Option<HistoryDigest>,
}

fn deadline_for(status: TaskStatus, entered_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    status
        .sla()
        .and_then(|sla| entered_at.checked_add_signed(sla))
}

impl Task {
    /// Creates a task in [`TaskStatus::INITIAL`] from a classified complaint.
    #[must_use]
    pub fn new_from_complaint(origin: ComplaintOrigin, clock: &impl Clock) -> Self {
        let timestamp = now_from(clock);
        let status = TaskStatus::INITIAL;
        Self {
            id: TaskId::new(),
            origin,
            status,
            created_at: timestamp,
            status_entered_at: timestamp,
            deadline: deadline_for(status, timestamp),
            version: TaskVersion::INITIAL,
            history_head: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            origin: data.origin,
            status: data.status,
            created_at: data.created_at,
            status_entered_at: data.status_entered_at,
            deadline: data.deadline,
            version: data.version,
            history_head: data.history_head,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the complaint the task was derived from.
    #[must_use]
    pub const fn origin(&self) -> &ComplaintOrigin {
        &self.origin
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the time the current status began.
    #[must_use]
    pub const fn status_entered_at(&self) -> DateTime<Utc> {
        self.status_entered_at
    }

    /// Returns the deadline for the current status, if it carries one.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub const fn version(&self) -> TaskVersion {
        self.version
    }

    /// Returns the digest of the newest history entry.
    #[must_use]
    pub const fn history_head(&self) -> Option<HistoryDigest> {
        self.history_head
    }

    /// Checks the rule table for a move to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::IllegalTransition`] when the move is not
    /// permitted from the current status.
    pub const fn rule_to(&self, target: TaskStatus) -> Result<TransitionRule, TaskDomainError> {
        match self.status.rule_to(target) {
            Some(rule) => Ok(rule),
            None => Err(TaskDomainError::IllegalTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            }),
        }
    }

    /// Returns the timestamp a status change observed at `now` should carry.
    ///
    /// Clamped so `status_entered_at` never moves backwards when the clock
    /// does.
    #[must_use]
    pub fn transition_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.trunc_subsecs(TIMESTAMP_DIGITS).max(self.status_entered_at)
    }

    /// Applies a sealed history entry to the task.
    ///
    /// The entry must continue this task's chain: same task, starting from
    /// the current status, numbered after the current version and linked to
    /// the current history head.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::IllegalTransition`] when the rule table
    /// rejects the move and [`TaskDomainError::HistoryMismatch`] when the
    /// entry does not continue the chain. The task is unchanged on error.
    pub fn apply(&mut self, entry: &HistoryEntry) -> Result<(), TaskDomainError> {
        let rule = self.rule_to(entry.to())?;
        let continues_chain = entry.task_id() == self.id
            && entry.from() == self.status
            && entry.sequence() == self.version.next().value()
            && entry.previous_digest() == self.history_head;
        if !continues_chain {
            return Err(TaskDomainError::HistoryMismatch {
                task_id: self.id,
                sequence: entry.sequence(),
            });
        }

        let entered_at = self.transition_timestamp(entry.recorded_at());
        self.status = rule.to;
        self.status_entered_at = entered_at;
        self.deadline = rule.sla.and_then(|sla| entered_at.checked_add_signed(sla));
        self.version = self.version.next();
        self.history_head = Some(entry.digest());
        Ok(())
    }
}
