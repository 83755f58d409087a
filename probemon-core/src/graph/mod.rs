//! Read-side assembly of a renderable series.
//!
//! Resolves the metric, picks a bin count, reads (possibly thinned) rows
//! from the [`SeriesStore`], bins them with the metric's transform, and
//! settles the y-axis range. Drawing is left to an external renderer.

mod timerange;
mod units;

pub use timerange::{unix_now, TimeRange};
pub use units::UnitPrefix;

use crate::binning::{self, Bin, BinOp};
use crate::error::{ProbemonError, Result};
use crate::registry::{GraphOptions, MetricName, MetricRegistry};
use crate::storage::{SeriesQuery, SeriesStore};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Read-path tunables.
#[derive(Debug, Clone)]
pub struct GraphSettings {
    /// Desired bin width; the actual width is `span / bins`.
    pub bin_width: Duration,
    /// Upper bound on bins per series.
    pub max_bins: usize,
    /// Downsampling scale, at least 1.
    pub downsampling_scale: u32,
    /// Collection period, used to estimate samples per bin.
    pub measure_period: Duration,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            bin_width: Duration::from_secs(60),
            max_bins: 300,
            downsampling_scale: 1,
            measure_period: Duration::from_secs(60),
        }
    }
}

/// Number of bins for a range: one per `bin_width`, capped at `max_bins`.
pub fn bin_count(range: &TimeRange, bin_width: Duration, max_bins: usize) -> Result<usize> {
    let width = bin_width.as_secs() as i64;
    if width <= 0 {
        return Err(ProbemonError::InvalidQuery { reason: "bin width must be at least 1s".into() });
    }

    let bins = ((range.span_secs() / width).max(0) as usize).min(max_bins);
    if bins == 0 {
        return Err(ProbemonError::InvalidQuery { reason: "cannot graph zero bins".into() });
    }
    Ok(bins)
}

/// Y-axis bounds handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Settle the axis from the series range and the metric's overrides.
    ///
    /// A flat series is widened by one in each direction, an empty one falls
    /// back to `[0, 1]`, and `y_min`/`y_max` always win.
    pub fn resolve(min: Option<f64>, max: Option<f64>, options: &GraphOptions) -> Self {
        let (mut lo, mut hi) = match (min, max) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => (0.0, 1.0),
        };
        if lo == hi {
            lo -= 1.0;
            hi += 1.0;
        }
        if let Some(y) = options.y_min {
            lo = y;
        }
        if let Some(y) = options.y_max {
            hi = y;
        }
        Self { min: lo, max: hi }
    }
}

/// What to graph.
#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub metric: String,
    pub range: TimeRange,
    /// Read every row even if the metric would normally be thinned.
    pub force_no_downsample: bool,
}

/// Everything a renderer needs for one graph.
#[derive(Debug, Clone, Serialize)]
pub struct RenderableSeries {
    pub metric: MetricName,
    pub description: String,
    pub range: TimeRange,
    pub op: BinOp,
    /// Rows read from storage, after any thinning.
    pub rows: usize,
    /// Empty bins carry a NaN value (`null` in JSON).
    pub bins: Vec<Bin>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub axis: AxisRange,
    pub unit_prefix: UnitPrefix,
}

impl RenderableSeries {
    /// Axis labels for the bottom and top of the graph.
    pub fn axis_labels(&self) -> (String, String) {
        (self.unit_prefix.format(self.axis.min), self.unit_prefix.format(self.axis.max))
    }
}

/// Resolve, read, bin, and scale one metric's series.
#[instrument(skip(store, registry, settings), fields(metric = %request.metric))]
pub async fn build_series(
    store: &SeriesStore,
    registry: &MetricRegistry,
    request: &SeriesRequest,
    settings: &GraphSettings,
) -> Result<RenderableSeries> {
    let metric = registry.get(&request.metric)?;
    let range = request.range;
    let bins = bin_count(&range, settings.bin_width, settings.max_bins)?;

    let query = SeriesQuery {
        start: range.start,
        end: range.end,
        target_bins: bins,
        scale: settings.downsampling_scale,
        measure_period: settings.measure_period,
        force_no_downsample: request.force_no_downsample,
    };
    let datapoints = store.query(&metric, &query).await?;
    debug!(rows = datapoints.len(), bins, "Binning series");

    let op = metric.options.bin_op();
    let binned = binning::bin(&datapoints, bins, range.start, range.end, op)?;
    let axis = AxisRange::resolve(binned.min, binned.max, &metric.options);

    Ok(RenderableSeries {
        metric: metric.name.clone(),
        description: metric.description.clone(),
        range,
        op,
        rows: datapoints.len(),
        bins: binned.bins().collect(),
        min: binned.min,
        max: binned.max,
        axis,
        unit_prefix: metric.options.unit_prefix,
    })
}
