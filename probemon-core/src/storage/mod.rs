//! SQLite persistence for metric time series.
//!
//! Each metric owns one table, `probemon_metric_<name>`, plus one index.
//! All mutation goes through a single [`TaskWriter`] that owns the only
//! read-write connection; graph reads use a separate read-only pool and
//! rely on WAL mode to run alongside the writer.
//!
//! ```text
//! Collector ──Insert──┐
//!                     ├──► mpsc (bounded) ──► TaskWriter ──► SQLite (WAL)
//! Pruner ─────Prune───┘                                         │
//!                                                               ▼
//!                                   SeriesStore (read-only) ◄───┘
//! ```

pub mod migrations;
mod pruner;
mod series;
mod writer;

pub use pruner::Pruner;
pub use series::{
    downsample_threshold, Datapoint, SeriesQuery, SeriesStore, DOWNSAMPLE_DENOMINATOR,
};
pub use writer::TaskWriter;

use crate::error::{ProbemonError, Result};
use crate::registry::{MetricRegistry, MetricSpec};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::ConnectOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// A unit of work for the writer.
#[derive(Debug, Clone)]
pub enum StorageTask {
    /// Append a value; the database stamps it with the current time.
    Insert { metric: Arc<MetricSpec>, value: f64 },
    /// Delete rows older than `now - retention`.
    Prune { metric: Arc<MetricSpec>, retention: Duration },
}

impl StorageTask {
    /// The metric this task touches.
    pub fn metric(&self) -> &MetricSpec {
        match self {
            StorageTask::Insert { metric, .. } | StorageTask::Prune { metric, .. } => metric,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageTask::Insert { .. } => "insert",
            StorageTask::Prune { .. } => "prune",
        }
    }
}

/// Create the bounded queue between producers and the writer.
///
/// A full queue blocks producers, so a slow writer throttles collection.
pub fn task_queue(capacity: usize) -> (mpsc::Sender<StorageTask>, mpsc::Receiver<StorageTask>) {
    mpsc::channel(capacity.max(1))
}

/// The single read-write connection to the series database.
///
/// Deliberately not `Clone`: whoever holds it is the only writer.
pub struct WriteConnection {
    conn: SqliteConnection,
}

impl WriteConnection {
    /// Open (creating if needed) the database in WAL mode.
    #[instrument(skip(db_path), fields(path = %db_path.as_ref().display()))]
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        info!("Opening series database for writing");

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProbemonError::IoError { path: parent.to_path_buf(), source: e })?;
        }

        let mut conn = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .log_statements(tracing::log::LevelFilter::Trace)
            .connect()
            .await
            .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?;

        let version: std::result::Result<String, sqlx::Error> =
            sqlx::query_scalar("SELECT sqlite_version()").fetch_one(&mut conn).await;
        match version {
            Ok(version) => info!(sqlite_version = %version, "Series database opened"),
            Err(e) => warn!(error = %e, "Unable to read SQLite version"),
        }

        Ok(Self { conn })
    }

    /// Create every metric's table and index. Idempotent; fatal on failure.
    pub async fn migrate(&mut self, registry: &MetricRegistry) -> Result<()> {
        migrations::run(&mut self.conn, registry).await
    }

    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GraphOptions, MetricName};

    fn spec(name: &str) -> Arc<MetricSpec> {
        Arc::new(MetricSpec {
            name: MetricName::parse(name).unwrap(),
            description: String::new(),
            command: "true".into(),
            options: GraphOptions::default(),
        })
    }

    #[test]
    fn test_task_accessors() {
        let insert = StorageTask::Insert { metric: spec("a"), value: 1.0 };
        let prune = StorageTask::Prune { metric: spec("b"), retention: Duration::from_secs(5) };
        assert_eq!(insert.kind(), "insert");
        assert_eq!(prune.kind(), "prune");
        assert_eq!(insert.metric().name.as_str(), "a");
        assert_eq!(prune.metric().name.as_str(), "b");
    }

    #[tokio::test]
    async fn test_queue_preserves_order() {
        let (tx, mut rx) = task_queue(4);
        for i in 0..4 {
            tx.send(StorageTask::Insert { metric: spec("a"), value: i as f64 }).await.unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(StorageTask::Insert { value, .. }) = rx.recv().await {
            seen.push(value);
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let (tx, _rx) = task_queue(0);
        assert_eq!(tx.max_capacity(), 1);
    }
}
