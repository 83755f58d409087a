//! Observability infrastructure: tracing and process metrics.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod metrics;

/// Logging and metrics settings, usually taken from [`Config`](crate::Config).
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub log_level: String,
    /// Serve Prometheus metrics here when set.
    pub metrics_listen_addr: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), metrics_listen_addr: None }
    }
}

impl From<&crate::Config> for ObservabilityConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            metrics_listen_addr: config.metrics_listen_addr,
        }
    }
}

/// Initialize the global observability infrastructure.
///
/// Call once at startup. Fails if a global subscriber or recorder is
/// already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .try_init()?;

    match config.metrics_listen_addr {
        Some(addr) => {
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            tracing::info!("Observability initialized (Prometheus metrics on {})", addr);
        }
        None => {
            tracing::info!("Observability initialized (metrics exporter disabled)");
        }
    }

    metrics::register_core_metrics();

    Ok(())
}
