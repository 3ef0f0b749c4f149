//! Civicworks: task lifecycle engine for municipal public-works complaints.
//!
//! This crate turns classified citizen complaints into remediation tasks and
//! governs every status change those tasks go through: which moves are legal,
//! who made them and when, and whether a task overstayed the time allowed in
//! a status.
//!
//! # Architecture
//!
//! Civicworks follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`task`]: Task creation, lifecycle transitions, audit trail and
//!   service-level breach detection

pub mod task;
