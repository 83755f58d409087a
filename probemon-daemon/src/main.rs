//! probemond: the measurement process.
//!
//! Validates the configured metrics, creates their tables, then runs the
//! collector, pruner, and single storage writer until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use probemon_core::{
    init_observability, task_queue, Collector, Config, ObservabilityConfig, Pruner, TaskWriter,
    WriteConnection,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod shutdown;

#[derive(Parser)]
#[command(name = "probemond")]
#[command(about = "Run shell probes on a schedule and store their values", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (default: $PROBEMON_CONFIG or <data dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the series database path
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = &args.db {
        config.db_path = db.to_string_lossy().to_string();
    }

    // Initialize observability FIRST
    init_observability(&ObservabilityConfig::from(&config))
        .map_err(|e| anyhow::anyhow!("Failed to initialize observability: {}", e))?;

    info!("probemon daemon starting");

    if let Err(e) = config.validate() {
        error!("Cannot proceed with measure: {}", e);
        return Err(e.into());
    }
    let registry = config.registry()?;
    if registry.is_empty() {
        info!("No metrics configured; only pruning will run");
    }

    info!("Opening series database at {}", config.db_path);
    let mut conn = WriteConnection::open(&config.db_path)
        .await
        .with_context(|| format!("Failed to open {}", config.db_path))?;
    if let Err(e) = conn.migrate(&registry).await {
        error!("Cannot proceed with measure: {}", e);
        return Err(e.into());
    }

    let cancel = CancellationToken::new();
    let signals = shutdown::cancel_on_signal(cancel.clone());
    let (tx, rx) = task_queue(config.queue_capacity);

    let writer = tokio::spawn({
        let cancel = cancel.clone();
        let mut writer = TaskWriter::new(conn);
        async move { writer.run(cancel, rx).await }
    });

    let pruner = Pruner::new(registry.metrics().to_vec(), config.retention(), config.prune_period());
    let pruner = tokio::spawn(pruner.run(cancel.clone(), tx.clone()));

    let collector = Collector::new(
        config.shell.clone(),
        config.measure_period(),
        registry.metrics().to_vec(),
        tx,
    );
    let collector = tokio::spawn(collector.run(cancel.clone()));

    info!(metrics = registry.len(), "probemon daemon ready");

    cancel.cancelled().await;

    shutdown::join("collector", collector).await;
    shutdown::join("pruner", pruner).await;
    shutdown::join("storage writer", writer).await;
    signals.abort();

    info!("probemon daemon shutting down");
    Ok(())
}
