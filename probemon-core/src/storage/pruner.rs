//! Periodic retention enforcement.

use super::StorageTask;
use crate::registry::MetricSpec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Emits one [`StorageTask::Prune`] per metric every `period`.
pub struct Pruner {
    metrics: Vec<Arc<MetricSpec>>,
    retention: Duration,
    period: Duration,
}

impl Pruner {
    pub fn new(metrics: Vec<Arc<MetricSpec>>, retention: Duration, period: Duration) -> Self {
        Self { metrics, retention, period }
    }

    /// Queue a prune for every metric.
    ///
    /// Returns `false` once the writer side of the queue has gone away.
    pub async fn enqueue_all(&self, tasks: &mpsc::Sender<StorageTask>) -> bool {
        for metric in &self.metrics {
            let task = StorageTask::Prune { metric: metric.clone(), retention: self.retention };
            if tasks.send(task).await.is_err() {
                warn!("Task queue closed, pruner stopping");
                return false;
            }
        }
        true
    }

    /// Run until cancelled or until the task queue closes. The first pass
    /// happens one period after start.
    #[instrument(skip_all, name = "pruner")]
    pub async fn run(self, cancel: CancellationToken, tasks: mpsc::Sender<StorageTask>) {
        info!("Entering pruning loop with period of {:?}", self.period);

        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Pruner stopping");
                    return;
                }
                _ = interval.tick() => {
                    let sent = tokio::select! {
                        _ = cancel.cancelled() => return,
                        sent = self.enqueue_all(&tasks) => sent,
                    };
                    if !sent {
                        return;
                    }
                }
            }
        }
    }
}
