//! Service-level breach detection.

use super::TaskLifecycleResult;
use crate::task::{
    domain::{BreachRecord, Task, now_from},
    ports::TaskRepository,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one sweep over the SLA-bearing tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Tasks examined.
    pub scanned: usize,
    /// Breaches newly recorded by this sweep.
    pub recorded: usize,
    /// Breached occurrences that already had a record.
    pub already_recorded: usize,
    /// Tasks skipped because recording their breach failed.
    pub failed: usize,
}

/// Detects tasks that have overstayed their status deadline.
///
/// Detection runs in two modes: inline, when a transition leaves an overdue
/// status, and periodically, through [`sweep`](Self::sweep). Both key records on the status occurrence, so a
/// breach is recorded at most once however often it is observed.
#[derive(Clone)]
pub struct SlaBreachDetector<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> SlaBreachDetector<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a detector.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Returns a breach record when `task` is past its deadline now.
    ///
    /// Nothing is written; see [`BreachRecord::check`] for the rule.
    #[must_use]
    pub fn evaluate(&self, task: &Task) -> Option<BreachRecord> {
        self.evaluate_at(task, now_from(&*self.clock))
    }

    /// Returns a breach record when `task` is past its deadline at `now`.
    ///
    /// Used where the caller has already fixed the reference time, such as a
    /// transition stamping its history entry or a sweep pass.
    #[must_use]
    #[expect(
        clippy::unused_self,
        reason = "inline and sweep detection both go through the detector"
    )]
    pub fn evaluate_at(&self, task: &Task, now: DateTime<Utc>) -> Option<BreachRecord> {
        BreachRecord::check(task, now)
    }

    /// Evaluates `task` against the current time and records any breach.
    ///
    /// Returns the record only when it was newly inserted; a repeated call for
    /// an occurrence that already has a record returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::Repository`] when the insert
    /// fails.
    pub async fn evaluate_and_record(
        &self,
        task: &Task,
    ) -> TaskLifecycleResult<Option<BreachRecord>> {
        let Some(breach) = self.evaluate(task) else {
            return Ok(None);
        };
        let inserted = self.repository.insert_breach_if_absent(&breach).await?;
        Ok(inserted.then_some(breach))
    }

    /// Scans every SLA-bearing task once and records new breaches.
    ///
    /// The reference time is read before tasks are listed, so a task that
    /// moves on concurrently is judged against a time that precedes its new
    /// status. A failure on one task is logged and the scan continues.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::Repository`] when the task
    /// listing itself fails.
    pub async fn sweep(&self) -> TaskLifecycleResult<SweepReport> {
        let now = now_from(&*self.clock);
        let tasks = self.repository.list_sla_bearing().await?;
        let mut report = SweepReport {
            scanned: tasks.len(),
            ..SweepReport::default()
        };

        for task in &tasks {
            let Some(breach) = self.evaluate_at(task, now) else {
                continue;
            };
            match self.repository.insert_breach_if_absent(&breach).await {
                Ok(true) => {
                    report.recorded += 1;
                    info!(
                        task_id = %breach.task_id(),
                        status = %breach.status(),
                        department = %breach.department(),
                        elapsed_secs = breach.elapsed().num_seconds(),
                        "sla breach recorded"
                    );
                }
                Ok(false) => report.already_recorded += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(task_id = %task.id(), error = %err, "failed to record sla breach");
                }
            }
        }

        debug!(
            scanned = report.scanned,
            recorded = report.recorded,
            failed = report.failed,
            "sla sweep finished"
        );
        Ok(report)
    }

    /// Returns every breach record, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::Repository`] when the read fails.
    pub async fn breaches(&self) -> TaskLifecycleResult<Vec<BreachRecord>> {
        Ok(self.repository.list_breaches().await?)
    }

    /// Returns breaches whose task has not yet left the breached status.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::Repository`] when the read fails.
    pub async fn open_breaches(&self) -> TaskLifecycleResult<Vec<BreachRecord>> {
        Ok(self.repository.list_open_breaches().await?)
    }
}
