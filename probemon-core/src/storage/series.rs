//! Series retrieval with optional statistical thinning.

use crate::error::{ProbemonError, Result};
use crate::observability::metrics::record_series_rows;
use crate::registry::MetricSpec;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Row};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Modulus applied to `RANDOM()` by the thinning predicate.
pub const DOWNSAMPLE_DENOMINATOR: i64 = 1_000_000;

/// A stored sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Datapoint {
    /// Unix timestamp (seconds).
    pub timestamp: i64,
    pub value: f64,
}

/// Parameters for one series read.
#[derive(Debug, Clone)]
pub struct SeriesQuery {
    /// Inclusive range start, unix seconds.
    pub start: i64,
    /// Inclusive range end, unix seconds.
    pub end: i64,
    /// Number of bins the caller will aggregate into.
    pub target_bins: usize,
    /// Larger values thin less aggressively. Must be at least 1.
    pub scale: u32,
    /// Expected interval between stored samples.
    pub measure_period: Duration,
    /// Skip thinning for this request regardless of ratio.
    pub force_no_downsample: bool,
}

/// Threshold for the `ABS(RANDOM() % D) < T` predicate, or `None` when the
/// range is narrow enough to read every row.
///
/// The oversampling ratio is the expected number of samples per output bin.
/// Thinning kicks in once `osr / scale` reaches 2 and keeps roughly
/// `scale / osr` of the rows.
pub fn downsample_threshold(
    start: i64,
    end: i64,
    target_bins: usize,
    scale: u32,
    measure_period: Duration,
) -> Option<i64> {
    let period = measure_period.as_secs_f64();
    if target_bins == 0 || period <= 0.0 || end <= start {
        return None;
    }

    let bin_width = (end as f64 - start as f64) / target_bins as f64;
    let osr = bin_width / period;
    let ratio = osr / f64::from(scale.max(1));
    if ratio < 2.0 {
        return None;
    }

    Some(((DOWNSAMPLE_DENOMINATOR as f64 / ratio) as i64).max(1))
}

/// Read side of the series database.
///
/// Holds a pool of read-only connections; reads never contend with the
/// writer because the database runs in WAL mode.
#[derive(Clone)]
pub struct SeriesStore {
    pool: SqlitePool,
}

impl SeriesStore {
    /// Open a read-only pool on an existing database.
    #[instrument(skip(db_path), fields(path = %db_path.as_ref().display()))]
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .read_only(true)
            .log_statements(tracing::log::LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?;

        info!("Series database opened for reading");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch rows for `metric` with timestamps in `[start, end]`, ascending.
    #[instrument(skip(self, metric), fields(metric = %metric.name))]
    pub async fn query(&self, metric: &MetricSpec, query: &SeriesQuery) -> Result<Vec<Datapoint>> {
        if query.start > query.end {
            return Err(ProbemonError::InvalidTimeRange { start: query.start, end: query.end });
        }

        let threshold = if query.force_no_downsample || metric.options.no_downsample {
            None
        } else {
            downsample_threshold(
                query.start,
                query.end,
                query.target_bins,
                query.scale,
                query.measure_period,
            )
        };

        let thinning = if threshold.is_some() {
            format!("AND ABS(RANDOM() % {}) < ?", DOWNSAMPLE_DENOMINATOR)
        } else {
            String::new()
        };
        let sql = format!(
            r#"
            SELECT CAST(strftime('%s', timestamp) AS INTEGER) AS ts, value
            FROM {}
            WHERE timestamp BETWEEN DATETIME(?, 'unixepoch') AND DATETIME(?, 'unixepoch')
            {}
            ORDER BY timestamp ASC, id ASC
            "#,
            metric.name.table_ident(),
            thinning
        );

        let mut q = sqlx::query(&sql).bind(query.start).bind(query.end);
        if let Some(threshold) = threshold {
            debug!(threshold, "Thinning series rows");
            q = q.bind(threshold);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?;

        let points = rows
            .into_iter()
            .map(|row| {
                Ok(Datapoint {
                    timestamp: row
                        .try_get::<i64, _>("ts")
                        .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?,
                    value: row
                        .try_get::<f64, _>("value")
                        .map_err(|e| ProbemonError::DatabaseError(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        record_series_rows(points.len(), threshold.is_some());
        Ok(points)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
