//! Application services for the task lifecycle engine.

mod audit;
mod breach;
mod config;
mod error;
mod lifecycle;
mod pipeline;
mod sweep;

pub use audit::AuditTrailRecorder;
pub use breach::{SlaBreachDetector, SweepReport};
pub use config::{AuditLimits, LifecycleConfig, SweepConfig};
pub use error::{TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::{TaskLifecycleService, TransitionTaskRequest};
pub use pipeline::{PipelineOrchestrator, StructuredComplaint};
pub use sweep::SlaSweepWorker;
