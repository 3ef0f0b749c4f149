//! Task status enumeration and the lifecycle rule table.
//!
//! The rule table is the single source of truth for which status changes are
//! legal and how long a task may remain in each status before its service
//! level is breached.

use super::ParseTaskStatusError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Complaint has been turned into a task but nobody has looked at it.
    Received,
    /// Task has been reviewed and accepted as actionable.
    Triaged,
    /// A crew or owner has been assigned.
    Assigned,
    /// Remediation work is underway.
    InProgress,
    /// Work is complete and awaiting sign-off.
    Resolved,
    /// Task has been signed off.
    Closed,
    /// Task was rejected during intake or triage.
    Rejected,
}

/// Every status in lifecycle order.
pub const ALL_STATUSES: [TaskStatus; 7] = [
    TaskStatus::Received,
    TaskStatus::Triaged,
    TaskStatus::Assigned,
    TaskStatus::InProgress,
    TaskStatus::Resolved,
    TaskStatus::Closed,
    TaskStatus::Rejected,
];

const HOUR_SECONDS: i64 = 60 * 60;

impl TaskStatus {
    /// Status assigned to every newly created task.
    pub const INITIAL: Self = Self::Received;

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Triaged => "triaged",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }

    /// Returns the wall-clock time a task may spend in this status, or `None`
    /// when the status carries no service level.
    #[must_use]
    pub const fn sla(self) -> Option<TimeDelta> {
        let hours = match self {
            Self::Received | Self::Triaged | Self::Assigned => 24,
            Self::InProgress => 72,
            Self::Resolved => 48,
            Self::Closed | Self::Rejected => return None,
        };
        TimeDelta::try_seconds(hours * HOUR_SECONDS)
    }

    /// Returns `true` when moving from `self` to `target` is permitted.
    ///
    /// `Closed` and `Resolved` may be reopened into `Assigned`; every other
    /// edge follows the forward lifecycle.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Received, Self::Triaged | Self::Rejected)
                | (Self::Triaged, Self::Assigned | Self::Rejected)
                | (Self::Assigned, Self::InProgress)
                | (Self::InProgress, Self::Resolved)
                | (Self::Resolved, Self::Closed | Self::Assigned)
                | (Self::Closed, Self::Assigned)
        )
    }

    /// Returns `true` for statuses that end the forward lifecycle.
    ///
    /// `Closed` is terminal but still admits the reopen edge.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    /// Looks up the rule for `self -> target`.
    ///
    /// Returns `None` when the transition is illegal.
    #[must_use]
    pub const fn rule_to(self, target: Self) -> Option<TransitionRule> {
        if !self.can_transition_to(target) {
            return None;
        }
        Some(TransitionRule {
            from: self,
            to: target,
            sla: target.sla(),
        })
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "received" => Ok(Self::Received),
            "triaged" => Ok(Self::Triaged),
            "assigned" => Ok(Self::Assigned),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A legal edge of the lifecycle graph together with the service level
/// attached to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Status the task leaves.
    pub from: TaskStatus,
    /// Status the task enters.
    pub to: TaskStatus,
    /// Allotted time in `to`, if any.
    pub sla: Option<TimeDelta>,
}
