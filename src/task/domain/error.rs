//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned by task aggregate operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The rule table does not permit the requested status change.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    IllegalTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// A history entry does not continue the task's current chain.
    #[error("history entry {sequence} does not continue the chain of task {task_id}")]
    HistoryMismatch {
        /// Task the entry was applied to.
        task_id: TaskId,
        /// Sequence carried by the entry.
        sequence: u64,
    },
}

/// Errors raised while validating audit input supplied by callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The actor identifier is empty after trimming.
    #[error("actor must not be empty")]
    EmptyActor,

    /// The actor identifier exceeds the configured bound.
    #[error("actor is {actual} characters long, maximum is {max}")]
    ActorTooLong {
        /// Configured maximum.
        max: usize,
        /// Supplied length.
        actual: usize,
    },

    /// The remark exceeds the configured bound.
    #[error("remark is {actual} characters long, maximum is {max}")]
    RemarkTooLong {
        /// Configured maximum.
        max: usize,
        /// Supplied length.
        actual: usize,
    },

    /// A status string supplied by a caller is not a known status.
    #[error(transparent)]
    UnknownStatus(#[from] ParseTaskStatusError),
}

/// Errors raised when a structured complaint is incomplete or malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidInputError {
    /// A required complaint field is missing or blank.
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    /// A complaint field exceeds its storage width.
    #[error("field '{field}' exceeds {max} characters ({actual})")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum accepted length in characters.
        max: usize,
        /// Length supplied.
        actual: usize,
    },

    /// The urgency value is not recognised.
    #[error("unknown urgency: {0}")]
    UnknownUrgency(String),
}

/// Error returned while parsing task statuses from persistence or callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Integrity failures found while verifying a task's history chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryChainError {
    /// An entry's previous status does not match the preceding entry.
    #[error("entry {sequence} starts from {found}, expected {expected}")]
    BrokenStatusChain {
        /// Sequence number of the offending entry.
        sequence: u64,
        /// Status the chain required.
        expected: TaskStatus,
        /// Status recorded on the entry.
        found: TaskStatus,
    },

    /// Sequence numbers are not contiguous.
    #[error("entry {found} follows sequence {expected_previous}")]
    SequenceGap {
        /// Sequence of the preceding entry.
        expected_previous: u64,
        /// Sequence found.
        found: u64,
    },

    /// An entry does not link to the digest of its predecessor.
    #[error("entry {sequence} is not linked to its predecessor")]
    BrokenLink {
        /// Sequence number of the offending entry.
        sequence: u64,
    },

    /// An entry's stored digest does not match its contents.
    #[error("entry {sequence} digest does not match its contents")]
    DigestMismatch {
        /// Sequence number of the offending entry.
        sequence: u64,
    },

    /// The stored chain ends before the task's current version or head.
    #[error("history holds {found} entries, task is at version {expected}")]
    Truncated {
        /// Entry count implied by the task version.
        expected: u64,
        /// Entries found.
        found: u64,
    },
}
