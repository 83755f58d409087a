//! Periodic probe execution.
//!
//! Every tick spawns one task per metric. Each task runs the metric's shell
//! pipeline under a timeout of half the period plus a margin, so at most
//! about two generations of probes are ever in flight. A successful numeric
//! result becomes a [`StorageTask::Insert`]; anything else is logged and
//! dropped without retry.

mod probe;

pub use probe::run_probe;

use crate::error::ProbemonError;
use crate::observability::metrics::record_probe;
use crate::registry::MetricSpec;
use crate::storage::StorageTask;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

/// Added to `period / 2` to form the per-probe timeout.
pub const PROBE_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// A successful probe result on its way to storage.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub metric: Arc<MetricSpec>,
    pub value: f64,
}

impl From<Measurement> for StorageTask {
    fn from(m: Measurement) -> Self {
        StorageTask::Insert { metric: m.metric, value: m.value }
    }
}

/// Runs every metric's probe once per period.
pub struct Collector {
    shell: String,
    period: Duration,
    metrics: Vec<Arc<MetricSpec>>,
    tasks: mpsc::Sender<StorageTask>,
    /// Incremented once per probe run, for log correlation.
    ordinal: AtomicU64,
}

impl Collector {
    pub fn new(
        shell: impl Into<String>,
        period: Duration,
        metrics: Vec<Arc<MetricSpec>>,
        tasks: mpsc::Sender<StorageTask>,
    ) -> Self {
        Self { shell: shell.into(), period, metrics, tasks, ordinal: AtomicU64::new(0) }
    }

    /// Upper bound on a single probe's run time.
    pub fn probe_timeout(&self) -> Duration {
        self.period / 2 + PROBE_TIMEOUT_MARGIN
    }

    /// Number of probe runs started so far.
    pub fn runs(&self) -> u64 {
        self.ordinal.load(Ordering::Relaxed)
    }

    /// Start one probe per metric without waiting for any of them.
    ///
    /// The returned handles may be dropped; the probes keep running.
    pub fn dispatch(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let total = self.metrics.len();
        let timeout = self.probe_timeout();

        self.metrics
            .iter()
            .enumerate()
            .map(|(n, metric)| {
                let ord = self.ordinal.fetch_add(1, Ordering::Relaxed) + 1;
                info!("{{{}}} Running command {}/{}: {:?}", ord, n + 1, total, metric.command);

                let span = info_span!("probe", ord, metric = %metric.name);
                let probe = Probe {
                    shell: self.shell.clone(),
                    metric: metric.clone(),
                    timeout,
                    tasks: self.tasks.clone(),
                };
                tokio::spawn(probe.run(cancel.clone()).instrument(span))
            })
            .collect()
    }

    /// Dispatch on every tick until cancelled. The first tick is one period
    /// after start.
    #[instrument(skip_all, name = "collector")]
    pub async fn run(self, cancel: CancellationToken) {
        info!("Entering measurement loop with period of {:?}", self.period);

        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(runs = self.runs(), "Collector stopping");
                    return;
                }
                _ = interval.tick() => {
                    self.dispatch(&cancel);
                }
            }
        }
    }
}

/// One probe run, owned by its spawned task.
struct Probe {
    shell: String,
    metric: Arc<MetricSpec>,
    timeout: Duration,
    tasks: mpsc::Sender<StorageTask>,
}

impl Probe {
    async fn run(self, cancel: CancellationToken) {
        let started = Instant::now();
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Probe abandoned on shutdown");
                return;
            }
            result = run_probe(&self.shell, &self.metric, self.timeout) => result,
        };
        let elapsed = started.elapsed();

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Probe failed, dropping measurement");
                record_probe(self.metric.name.as_str(), outcome(&e), elapsed);
                return;
            }
        };

        debug!(value, ?elapsed, "Probe returned");
        record_probe(self.metric.name.as_str(), "ok", elapsed);

        let task = Measurement { metric: self.metric, value }.into();
        tokio::select! {
            _ = cancel.cancelled() => debug!("Measurement dropped on shutdown"),
            sent = self.tasks.send(task) => {
                if sent.is_err() {
                    warn!("Task queue closed, dropping measurement");
                }
            }
        }
    }
}

fn outcome(e: &ProbemonError) -> &'static str {
    match e {
        ProbemonError::ProbeTimeout { .. } => "timeout",
        ProbemonError::ProbeOutputNotNumeric { .. } => "not_numeric",
        _ => "failed",
    }
}
