//! Task lifecycle engine for public-works complaints.
//!
//! A classified complaint becomes a task in `Received`. From there every
//! status change is checked against a fixed rule table, recorded in a
//! hash-chained audit trail and measured against the service level of the
//! status being left. A background sweep flags tasks that sit in a status
//! past their deadline. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
