//! Service-level breach records.

use super::{BreachId, Department, Priority, Task, TaskId, TaskStatus};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One continuous stay of a task in a status.
///
/// A task that leaves a status and later re-enters it starts a new occurrence
/// with a later `entered_at`, so each occurrence can be breached at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusOccurrence {
    /// Task that occupied the status.
    pub task_id: TaskId,
    /// The occupied status.
    pub status: TaskStatus,
    /// When the task entered the status.
    pub entered_at: DateTime<Utc>,
}

impl StatusOccurrence {
    /// Returns the occurrence the task currently sits in.
    #[must_use]
    pub const fn current(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            entered_at: task.status_entered_at(),
        }
    }
}

/// Immutable flag that a task overstayed its allotted time in a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachRecord {
    id: BreachId,
    occurrence: StatusOccurrence,
    deadline: DateTime<Utc>,
    detected_at: DateTime<Utc>,
    elapsed_seconds: i64,
    sla_seconds: i64,
    department: Department,
    priority: Priority,
}

/// Parameter object for reconstructing a persisted breach record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBreachData {
    /// Persisted identifier.
    pub id: BreachId,
    /// Breached occurrence.
    pub occurrence: StatusOccurrence,
    /// Deadline that was exceeded.
    pub deadline: DateTime<Utc>,
    /// Detection timestamp.
    pub detected_at: DateTime<Utc>,
    /// Seconds spent in the status at detection time.
    pub elapsed_seconds: i64,
    /// Allotted seconds for the status.
    pub sla_seconds: i64,
    /// Department owning the task.
    pub department: Department,
    /// Task priority at detection time.
    pub priority: Priority,
}

impl BreachRecord {
    /// Records that `task` had exceeded `deadline` when observed at
    /// `detected_at`.
    #[must_use]
    pub fn detected(task: &Task, deadline: DateTime<Utc>, detected_at: DateTime<Utc>) -> Self {
        let occurrence = StatusOccurrence::current(task);
        Self {
            id: BreachId::new(),
            occurrence,
            deadline,
            detected_at,
            elapsed_seconds: (detected_at - occurrence.entered_at).num_seconds(),
            sla_seconds: (deadline - occurrence.entered_at).num_seconds(),
            department: task.origin().department.clone(),
            priority: task.origin().priority,
        }
    }

    /// Returns a record when `task` has reached its deadline at `now`.
    ///
    /// Reaching the deadline exactly counts as a breach. Statuses without a
    /// service level never breach.
    #[must_use]
    pub fn check(task: &Task, now: DateTime<Utc>) -> Option<Self> {
        task.deadline()
            .filter(|deadline| now >= *deadline)
            .map(|deadline| Self::detected(task, deadline, now))
    }

    /// Reconstructs a breach record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBreachData) -> Self {
        Self {
            id: data.id,
            occurrence: data.occurrence,
            deadline: data.deadline,
            detected_at: data.detected_at,
            elapsed_seconds: data.elapsed_seconds,
            sla_seconds: data.sla_seconds,
            department: data.department,
            priority: data.priority,
        }
    }

    /// Returns the breach identifier.
    #[must_use]
    pub const fn id(&self) -> BreachId {
        self.id
    }

    /// Returns the breached occurrence.
    #[must_use]
    pub const fn occurrence(&self) -> StatusOccurrence {
        self.occurrence
    }

    /// Returns the breached task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.occurrence.task_id
    }

    /// Returns the status in which the breach occurred.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.occurrence.status
    }

    /// Returns the exceeded deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the detection timestamp.
    #[must_use]
    pub const fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    /// Returns the time spent in the status when the breach was detected.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.elapsed_seconds).unwrap_or(TimeDelta::MAX)
    }

    /// Returns the allotted time for the status.
    #[must_use]
    pub fn sla(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.sla_seconds).unwrap_or(TimeDelta::MAX)
    }

    /// Returns the owning department.
    #[must_use]
    pub const fn department(&self) -> &Department {
        &self.department
    }

    /// Returns the task priority at detection time.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns `true` while `task` still sits in the breached occurrence.
    ///
    /// Breaches are never mutated; they close implicitly once the task
    /// leaves the status.
    #[must_use]
    pub fn is_open_for(&self, task: &Task) -> bool {
        StatusOccurrence::current(task) == self.occurrence
    }
}
