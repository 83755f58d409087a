//! probemon core library
//!
//! Periodic shell-probe measurement into per-metric SQLite tables, retention
//! pruning through a single writer, and a read path that thins, bins, and
//! scales series for an external renderer.

pub mod binning;
pub mod collector;
pub mod config;
pub mod error;
pub mod graph;
pub mod observability;
pub mod paths;
pub mod registry;
pub mod storage;

// Re-export commonly used items
pub use binning::{bin, Bin, BinOp, BinnedSeries};
pub use collector::{Collector, Measurement};
pub use config::{Config, GraphConfig};
pub use error::{ProbemonError, Result};
pub use graph::{build_series, GraphSettings, RenderableSeries, SeriesRequest, TimeRange, UnitPrefix};
pub use observability::{init as init_observability, ObservabilityConfig};
pub use registry::{GraphOptions, MetricDefinition, MetricName, MetricRegistry, MetricSpec};
pub use storage::{
    task_queue, Datapoint, Pruner, SeriesQuery, SeriesStore, StorageTask, TaskWriter,
    WriteConnection,
};
