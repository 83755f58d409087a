//! The single consumer of storage tasks.

use super::{StorageTask, WriteConnection};
use crate::error::{ProbemonError, Result};
use crate::observability::metrics::record_storage_task;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Applies [`StorageTask`]s in receipt order over the only write connection.
pub struct TaskWriter {
    conn: WriteConnection,
}

impl TaskWriter {
    pub fn new(conn: WriteConnection) -> Self {
        Self { conn }
    }

    /// Drain `tasks` until cancelled. The loop also ends once every sender is
    /// gone and the queue is empty.
    ///
    /// Task failures are logged and skipped; nothing here ends the loop early.
    #[instrument(skip_all, name = "task_writer")]
    pub async fn run(&mut self, cancel: CancellationToken, mut tasks: mpsc::Receiver<StorageTask>) {
        info!("Storage writer started");
        loop {
            let task = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Storage writer stopping");
                    break;
                }
                task = tasks.recv() => match task {
                    Some(task) => task,
                    None => {
                        info!("Task queue closed, storage writer stopping");
                        break;
                    }
                },
            };

            let kind = task.kind();
            match self.apply(&task).await {
                Ok(()) => record_storage_task(kind, "ok"),
                Err(e) => {
                    error!(metric = %task.metric().name, kind, error = %e, "Storage task failed");
                    record_storage_task(kind, "error");
                }
            }
        }
    }

    /// Execute one task against the database.
    pub async fn apply(&mut self, task: &StorageTask) -> Result<()> {
        match task {
            StorageTask::Insert { metric, value } => {
                sqlx::query(&format!(
                    "INSERT INTO {} (value) VALUES (?)",
                    metric.name.table_ident()
                ))
                .bind(*value)
                .execute(self.conn.conn())
                .await
                .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?;

                debug!(metric = %metric.name, value, "Inserted measurement");
            }
            StorageTask::Prune { metric, retention } => {
                info!(
                    "Pruning metric {} of entries older than {:?}",
                    metric.name, retention
                );
                let result = sqlx::query(&format!(
                    "DELETE FROM {} WHERE timestamp < DATETIME('now', ?)",
                    metric.name.table_ident()
                ))
                .bind(format!("-{} seconds", retention.as_secs()))
                .execute(self.conn.conn())
                .await
                .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?;

                debug!(metric = %metric.name, deleted = result.rows_affected(), "Prune complete");
            }
        }
        Ok(())
    }
}
