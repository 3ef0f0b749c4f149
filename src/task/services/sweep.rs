//! Periodic background driver for the breach detector.

use super::SlaBreachDetector;
use crate::task::ports::TaskRepository;
use mockable::Clock;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// Runs [`SlaBreachDetector::sweep`] on a fixed interval until cancelled.
///
/// The first sweep runs immediately after [`spawn`](Self::spawn). A slow
/// sweep delays the next one instead of triggering a burst of catch-up runs.
pub struct SlaSweepWorker<R, C>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    detector: SlaBreachDetector<R, C>,
    interval: Duration,
    cancel: CancellationToken,
}

impl<R, C> SlaSweepWorker<R, C>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a worker; cancel `cancel` to stop it.
    #[must_use]
    pub const fn new(
        detector: SlaBreachDetector<R, C>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            detector,
            interval,
            cancel,
        }
    }

    /// Starts the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run().instrument(info_span!("sla_sweep")))
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "sla sweep worker started");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("sla sweep worker cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.detector.sweep().await {
                        warn!(error = %err, "sla sweep failed");
                    }
                }
            }
        }

        info!("sla sweep worker stopped");
    }
}
