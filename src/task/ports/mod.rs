//! Port contracts for the task lifecycle engine.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod repository;

pub use repository::{
    TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TransitionCommit,
};
