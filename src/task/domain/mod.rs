//! Domain model for the task lifecycle engine.
//!
//! The domain covers the lifecycle rule table, the task aggregate, the
//! hash-chained status history and service-level breach records. All
//! infrastructure concerns stay outside of this boundary.

mod breach;
mod complaint;
mod error;
mod history;
mod ids;
mod status;
mod task;

pub use breach::{BreachRecord, PersistedBreachData, StatusOccurrence};
pub use complaint::{
    Category, ComplaintOrigin, Department, Location, MAX_CATEGORY_CHARS, MAX_DEPARTMENT_CHARS,
    Priority,
};
pub use error::{
    HistoryChainError, InvalidInputError, ParseTaskStatusError, TaskDomainError, ValidationError,
};
pub use history::{
    Actor, HistoryCursor, HistoryDigest, HistoryEntry, HistoryPage, HistoryQuery,
    MAX_ACTOR_CHARS, NewHistoryEntry, ParseHistoryDigestError, PersistedHistoryEntry, Remark,
    verify_chain,
};
pub use ids::{BreachId, ComplaintId, HistoryEntryId, TaskId, TaskVersion};
pub use status::{ALL_STATUSES, TaskStatus, TransitionRule};
pub use task::{PersistedTaskData, Task};

pub(crate) use task::now_from;
