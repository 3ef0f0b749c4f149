//! Diesel row models for task lifecycle persistence.

use super::schema::{sla_breaches, task_status_history, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Row model for task records, used for both reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Source complaint reference.
    pub complaint_id: uuid::Uuid,
    /// Responsible department.
    pub department: String,
    /// Problem category.
    pub category: String,
    /// Reported location.
    pub location: String,
    /// Optional complaint description.
    pub description: Option<String>,
    /// Task priority.
    pub priority: String,
    /// Current lifecycle status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Time the current status began.
    pub status_entered_at: DateTime<Utc>,
    /// Deadline for the current status.
    pub deadline: Option<DateTime<Utc>>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Digest of the newest history entry.
    pub history_head: Option<String>,
}

/// Lifecycle columns rewritten by a transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskLifecycleChangeset {
    /// New status.
    pub status: String,
    /// Time the new status began.
    pub status_entered_at: DateTime<Utc>,
    /// Deadline for the new status.
    pub deadline: Option<DateTime<Utc>>,
    /// Version after the transition.
    pub version: i64,
    /// Digest of the appended history entry.
    pub history_head: Option<String>,
}

/// Row model for history entries.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    /// History entry identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// One-based position in the task's history.
    pub sequence: i64,
    /// Status before the transition.
    pub from_status: String,
    /// Status after the transition.
    pub to_status: String,
    /// Actor that requested the transition.
    pub changed_by: String,
    /// Caller remark.
    pub remark: String,
    /// Transition timestamp.
    pub recorded_at: DateTime<Utc>,
    /// Digest of the preceding entry.
    pub previous_digest: Option<String>,
    /// Digest of this entry.
    pub digest: String,
}

/// Row model for breach records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable, Insertable)]
#[diesel(table_name = sla_breaches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BreachRow {
    /// Breach identifier.
    pub id: uuid::Uuid,
    /// Breached task.
    pub task_id: uuid::Uuid,
    /// Status in which the breach occurred.
    pub status: String,
    /// Start of the breached occurrence.
    pub status_entered_at: DateTime<Utc>,
    /// Exceeded deadline.
    pub deadline: DateTime<Utc>,
    /// Detection timestamp.
    pub detected_at: DateTime<Utc>,
    /// Seconds spent in the status at detection.
    pub elapsed_seconds: i64,
    /// Allotted seconds for the status.
    pub sla_seconds: i64,
    /// Owning department.
    pub department: String,
    /// Task priority at detection.
    pub priority: String,
}
