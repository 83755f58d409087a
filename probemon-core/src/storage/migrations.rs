//! Per-metric schema creation.

use crate::error::{ProbemonError, Result};
use crate::registry::{MetricName, MetricRegistry};
use sqlx::SqliteConnection;
use tracing::{error, info, instrument};

/// Create the table and index for every registered metric.
///
/// Runs on the write connection before collection or serving starts. Every
/// metric is attempted; the returned error names all that failed.
#[instrument(skip_all, fields(metrics = registry.len()))]
pub async fn run(conn: &mut SqliteConnection, registry: &MetricRegistry) -> Result<()> {
    let total = registry.len();
    let mut failed = Vec::new();

    for (n, metric) in registry.metrics().iter().enumerate() {
        info!(
            "Maybe creating table and index for metric {}/{}: {} ({})",
            n + 1,
            total,
            metric.name,
            metric.description
        );

        if let Err(e) = create_metric_schema(conn, &metric.name).await {
            error!(metric = %metric.name, error = %e, "Failed to create table for metric");
            failed.push((metric.name.to_string(), e.to_string()));
        }
    }

    if failed.is_empty() {
        info!("Database migrations complete");
        return Ok(());
    }

    let metric = failed.iter().map(|(m, _)| m.as_str()).collect::<Vec<_>>().join(", ");
    let reason = failed.into_iter().map(|(_, e)| e).collect::<Vec<_>>().join("; ");
    Err(ProbemonError::MigrationFailed { metric, reason })
}

async fn create_metric_schema(
    conn: &mut SqliteConnection,
    name: &MetricName,
) -> std::result::Result<(), sqlx::Error> {
    let table = name.table_ident();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            value DOUBLE PRECISION,
            timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (value, timestamp)",
        name.index_ident(),
        table
    ))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
