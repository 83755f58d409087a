//! Time-bucket aggregation of raw datapoints.
//!
//! ```text
//! start        bin 0              bin 1              bin 2          end
//!   .------------------+------------------+------------------.
//!   | ts1   ts2   ts3  |               ts4| ts5              |
//!   '------------------+------------------+------------------'
//! ```
//!
//! The input must be sorted by ascending timestamp. A single cursor walks it
//! once; a point sitting exactly on a shared edge lands in the earlier bin
//! because the cursor never looks back.

use crate::error::{ProbemonError, Result};
use crate::storage::Datapoint;
use serde::{Deserialize, Serialize};

/// Per-bin value transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    /// The bin mean, unchanged.
    #[default]
    Identity,
    /// Backward difference against the nearest earlier non-empty bin, per second.
    Derivative,
}

impl BinOp {
    /// Transform bin `i` given the raw bin means and bin label timestamps.
    ///
    /// Only `raw[..=i]` and `labels[..=i]` are read.
    pub fn apply(&self, i: usize, raw: &[f64], labels: &[i64]) -> f64 {
        match self {
            BinOp::Identity => raw[i],
            BinOp::Derivative => {
                if i == 0 {
                    return f64::NAN;
                }
                // Go back as far as needed. The error grows with the gap but
                // beats returning NaN for sparse data.
                let Some(prev) = (0..i).rev().find(|&p| !raw[p].is_nan()) else {
                    return f64::NAN;
                };
                let dt = labels[i] - labels[prev];
                if dt == 0 {
                    return f64::NAN;
                }
                (raw[i] - raw[prev]) / dt as f64
            }
        }
    }
}

/// One output bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    /// Midpoint of the bin interval, unix seconds.
    pub label: i64,
    /// Transformed aggregate; NaN for an empty bin.
    pub value: f64,
}

/// Result of binning a series.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedSeries {
    pub values: Vec<f64>,
    pub labels: Vec<i64>,
    /// Smallest non-empty transformed value, `None` when every bin is empty.
    pub min: Option<f64>,
    /// Largest non-empty transformed value, `None` when every bin is empty.
    pub max: Option<f64>,
}

impl BinnedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(label, value)` pairs in time order.
    pub fn bins(&self) -> impl Iterator<Item = Bin> + '_ {
        self.labels.iter().zip(&self.values).map(|(&label, &value)| Bin { label, value })
    }
}

/// Aggregate sorted datapoints into `bin_count` equal-width bins over `[start, end]`.
///
/// Bin widths are whole seconds (`(end - start) / bin_count`, truncated). When
/// the span does not divide evenly, points in the last `span % bin_count`
/// seconds fall past the final bin and are dropped.
pub fn bin(
    datapoints: &[Datapoint],
    bin_count: usize,
    start: i64,
    end: i64,
    op: BinOp,
) -> Result<BinnedSeries> {
    if start > end {
        return Err(ProbemonError::InvalidTimeRange { start, end });
    }
    if bin_count == 0 {
        return Err(ProbemonError::InvalidQuery { reason: "cannot bin into zero bins".into() });
    }

    let span = end.checked_sub(start).ok_or_else(|| ProbemonError::InvalidQuery {
        reason: format!("time range {}..{} is too wide", start, end),
    })?;
    let width = span / bin_count as i64;
    let mut raw = Vec::with_capacity(bin_count);
    let mut labels = Vec::with_capacity(bin_count);
    let mut values = Vec::with_capacity(bin_count);
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;

    let mut cursor = 0usize;

    for i in 0..bin_count {
        let left = start + i as i64 * width;
        let right = left + width;
        let mut sum = 0.0;
        let mut count = 0usize;
        while let Some(dp) = datapoints.get(cursor) {
            if dp.timestamp < left || dp.timestamp > right {
                break;
            }
            sum += dp.value;
            count += 1;
            cursor += 1;
        }

        raw.push(if count > 0 { sum / count as f64 } else { f64::NAN });
        labels.push(left + width / 2);

        let value = op.apply(i, &raw, &labels);
        if !value.is_nan() {
            min = Some(min.map_or(value, |m| m.min(value)));
            max = Some(max.map_or(value, |m| m.max(value)));
        }
        values.push(value);
    }

    Ok(BinnedSeries { values, labels, min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2020-01-01T12:00:00Z
    const T0: i64 = 1_577_880_000;

    fn dp(offset_secs: i64, value: f64) -> Datapoint {
        Datapoint { timestamp: T0 + offset_secs, value }
    }

    fn almost_equals(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_bin_one_hour_into_four() {
        let dps = vec![
            // first bin
            dp(5 * 60, 10.0),
            dp(10 * 60, 20.0),
            dp(10 * 60, 0.0),
            // second bin
            dp(16 * 60, 100.0),
            // third bin is empty
            // fourth bin
            dp(57 * 60, -10.0),
            dp(59 * 60 + 59, 20.0),
            // past the last bin
            dp(61 * 60, 100000.0),
        ];

        let series = bin(&dps, 4, T0, T0 + 3600, BinOp::Identity).unwrap();

        assert_eq!(series.len(), 4);
        assert!(almost_equals(series.values[0], 10.0));
        assert!(almost_equals(series.values[1], 100.0));
        assert!(series.values[2].is_nan());
        assert!(almost_equals(series.values[3], 5.0));

        assert_eq!(
            series.labels,
            vec![T0 + 450, T0 + 15 * 60 + 450, T0 + 30 * 60 + 450, T0 + 45 * 60 + 450]
        );
        assert!(almost_equals(series.min.unwrap(), 5.0));
        assert!(almost_equals(series.max.unwrap(), 100.0));
    }

    #[test]
    fn test_shared_edge_goes_to_earlier_bin() {
        // 900s is both the right edge of bin 0 and the left edge of bin 1.
        let dps = vec![dp(0, 1.0), dp(900, 3.0), dp(901, 7.0)];
        let series = bin(&dps, 2, T0, T0 + 1800, BinOp::Identity).unwrap();
        assert!(almost_equals(series.values[0], 2.0));
        assert!(almost_equals(series.values[1], 7.0));
    }

    #[test]
    fn test_empty_input_leaves_range_unset() {
        let series = bin(&[], 3, T0, T0 + 300, BinOp::Identity).unwrap();
        assert!(series.values.iter().all(|v| v.is_nan()));
        assert_eq!(series.min, None);
        assert_eq!(series.max, None);
    }

    #[test]
    fn test_points_before_start_stall_the_cursor() {
        // Input is expected to be pre-filtered to the range; an earlier point
        // blocks the single forward pass.
        let dps = vec![dp(-10, 1.0), dp(10, 2.0)];
        let series = bin(&dps, 1, T0, T0 + 100, BinOp::Identity).unwrap();
        assert!(series.values[0].is_nan());
    }

    #[test]
    fn test_bad_arguments() {
        assert!(matches!(
            bin(&[], 4, T0 + 1, T0, BinOp::Identity),
            Err(ProbemonError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            bin(&[], 0, T0, T0 + 1, BinOp::Identity),
            Err(ProbemonError::InvalidQuery { .. })
        ));
        assert!(matches!(
            bin(&[], 4, i64::MIN, i64::MAX, BinOp::Identity),
            Err(ProbemonError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_uneven_span_drops_tail() {
        // 100s into 3 bins is 33s wide; the bins end at 99s.
        let dps = vec![dp(10, 1.0), dp(99, 2.0), dp(100, 50.0)];
        let series = bin(&dps, 3, T0, T0 + 100, BinOp::Identity).unwrap();
        assert_eq!(series.labels, vec![T0 + 16, T0 + 49, T0 + 82]);
        assert!(almost_equals(series.values[0], 1.0));
        assert!(series.values[1].is_nan());
        assert!(almost_equals(series.values[2], 2.0));
        assert!(almost_equals(series.max.unwrap(), 2.0));
    }

    #[test]
    fn test_derivative_first_bin_is_nan() {
        let raw = [10.0, 20.0];
        let labels = [0, 10];
        assert!(BinOp::Derivative.apply(0, &raw, &labels).is_nan());
        assert!(almost_equals(BinOp::Derivative.apply(1, &raw, &labels), 1.0));
    }

    #[test]
    fn test_derivative_skips_empty_bins() {
        let raw = [10.0, f64::NAN, f64::NAN, 40.0];
        let labels = [0, 100, 200, 300];
        assert!(BinOp::Derivative.apply(1, &raw, &labels).is_nan());
        assert!(almost_equals(BinOp::Derivative.apply(3, &raw, &labels), 0.1));
    }

    #[test]
    fn test_derivative_without_earlier_data_is_nan() {
        let raw = [f64::NAN, f64::NAN, 5.0];
        let labels = [0, 100, 200];
        assert!(BinOp::Derivative.apply(2, &raw, &labels).is_nan());
    }

    #[test]
    fn test_bin_with_derivative() {
        // Bin means 10, 30, empty, 90 at labels 450, 1350, 2250, 3150.
        let dps = vec![dp(100, 10.0), dp(1000, 30.0), dp(3000, 90.0)];
        let series = bin(&dps, 4, T0, T0 + 3600, BinOp::Derivative).unwrap();

        assert!(series.values[0].is_nan());
        assert!(almost_equals(series.values[1], 20.0 / 900.0));
        assert!(series.values[2].is_nan());
        assert!(almost_equals(series.values[3], 60.0 / 1800.0));
        // First bin has data but a NaN derivative, so it does not count.
        assert!(almost_equals(series.min.unwrap(), 20.0 / 900.0));
        assert!(almost_equals(series.max.unwrap(), 60.0 / 1800.0));
    }

    #[test]
    fn test_bins_iterator() {
        let dps = vec![dp(1, 4.0)];
        let series = bin(&dps, 2, T0, T0 + 10, BinOp::Identity).unwrap();
        let bins: Vec<Bin> = series.bins().collect();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].label, T0 + 2);
        assert!(almost_equals(bins[0].value, 4.0));
        assert!(bins[1].value.is_nan());
    }
}
