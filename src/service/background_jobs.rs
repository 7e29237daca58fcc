// service/background_jobs.rs
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};

use super::{error::ServiceError, escrow_service::EscrowService};
use crate::db::MarketStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Periodically settles delivered offers the client never answered, through
/// the same path as a manual completion.
pub struct AutoCompletionJob {
    store: Arc<dyn MarketStore>,
    escrow: EscrowService,
    period: Duration,
    grace: ChronoDuration,
}

impl AutoCompletionJob {
    pub fn new(
        store: Arc<dyn MarketStore>,
        escrow: EscrowService,
        period: Duration,
        grace: ChronoDuration,
    ) -> Self {
        Self {
            store,
            escrow,
            period,
            grace,
        }
    }

    /// One pass over offers delivered at least `grace` before `now`. A failing
    /// offer is logged and counted; the rest still run.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, ServiceError> {
        let cutoff = now - self.grace;
        let candidates = self.store.list_stale_delivered(cutoff).await?;

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for offer_id in candidates {
            match self.escrow.auto_complete(offer_id, cutoff).await {
                Ok(outcome) if outcome.applied => report.completed += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Auto-completion failed for offer {}: {}", offer_id, e);
                }
            }
        }

        Ok(report)
    }

    pub fn start(self) -> JobHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let job = Arc::new(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval(job.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracing::info!("Running auto-completion job at {}", Utc::now());
                        match job.sweep(Utc::now()).await {
                            Ok(report) => tracing::info!(
                                "Auto-completion job finished: scanned {}, completed {}, skipped {}, failed {}",
                                report.scanned,
                                report.completed,
                                report.skipped,
                                report.failed
                            ),
                            Err(e) => tracing::error!("Auto-completion job failed: {}", e),
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Auto-completion job stopped");
        });

        JobHandle { stop: stop_tx, task }
    }
}

pub struct JobHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Signals the loop and waits for an in-flight sweep to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Auto-completion job ended abnormally: {}", e);
        }
    }
}
