//! Graph time ranges.

use crate::error::{ProbemonError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static LAST_HOURS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^last-([0-9]+(\.[0-9]+)?)h$").expect("Invalid time range regex")
});

/// Inclusive `[start, end]` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// An explicit range. The span must fit in an `i64`.
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if start > end {
            return Err(ProbemonError::InvalidTimeRange { start, end });
        }
        if end.checked_sub(start).is_none() {
            return Err(ProbemonError::InvalidQuery {
                reason: format!("time range {}..{} is too wide", start, end),
            });
        }
        Ok(Self { start, end })
    }

    /// The `period` leading up to `now`.
    pub fn last(period: Duration, now: i64) -> Self {
        let secs = i64::try_from(period.as_secs()).unwrap_or(i64::MAX);
        Self { start: now.saturating_sub(secs), end: now }
    }

    /// Parse `last-<hours>h` relative to the current time.
    pub fn parse_expr(expr: &str) -> Result<Self> {
        Self::parse_expr_at(expr, unix_now())
    }

    /// Parse `last-<hours>h` relative to `now`.
    ///
    /// Fractional hours are honored down to whole minutes, so `last-1.5h` is
    /// ninety minutes.
    pub fn parse_expr_at(expr: &str, now: i64) -> Result<Self> {
        let expr = expr.trim();
        let caps = LAST_HOURS_REGEX.captures(expr).ok_or_else(|| ProbemonError::InvalidQuery {
            reason: format!("invalid time range expression: {:?}", expr),
        })?;

        let hours: f64 = caps[1].parse().map_err(|_| ProbemonError::InvalidQuery {
            reason: format!("invalid hours in time range expression: {:?}", expr),
        })?;
        if hours == 0.0 {
            return Err(ProbemonError::InvalidQuery { reason: "hours is zero".into() });
        }

        let too_wide = || ProbemonError::InvalidQuery {
            reason: format!("time range expression is too wide: {:?}", expr),
        };
        let whole = hours.trunc() as i64;
        let minutes = (hours.fract() * 60.0).trunc() as i64;
        let span = whole
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(minutes * 60))
            .ok_or_else(too_wide)?;
        let start = now.checked_sub(span).ok_or_else(too_wide)?;
        Self::new(start, now)
    }

    pub fn span_secs(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_parse_last_hours() {
        let table = [
            ("last-1h", 3600),
            ("last-24h", 86_400),
            ("last-1.5h", 5400),
            ("last-0.25h", 900),
            (" last-720h ", 720 * 3600),
        ];
        for (give, span) in table {
            let range = TimeRange::parse_expr_at(give, NOW).unwrap();
            assert_eq!(range.end, NOW, "{}", give);
            assert_eq!(range.span_secs(), span, "{}", give);
        }
    }

    #[test]
    fn test_parse_rejects() {
        for give in ["", "last-h", "last-0h", "last-0.0h", "last--1h", "last-1", "1h", "last-1.h"] {
            let err = TimeRange::parse_expr_at(give, NOW).unwrap_err();
            assert!(err.is_query_error(), "{}: {:?}", give, err);
        }
    }

    #[test]
    fn test_explicit_range() {
        assert!(TimeRange::new(10, 10).is_ok());
        assert!(matches!(TimeRange::new(11, 10), Err(ProbemonError::InvalidTimeRange { .. })));
        let range = TimeRange::last(Duration::from_secs(3600), NOW);
        assert_eq!(range, TimeRange { start: NOW - 3600, end: NOW });
    }

    #[test]
    fn test_oversized_ranges_are_rejected() {
        for give in ["last-99999999999999999999h", "last-9999999999999999h", "last-2562047788015216h"] {
            let err = TimeRange::parse_expr_at(give, NOW).unwrap_err();
            assert!(matches!(err, ProbemonError::InvalidQuery { .. }), "{}: {:?}", give, err);
        }

        let err = TimeRange::new(i64::MIN, i64::MAX).unwrap_err();
        assert!(matches!(err, ProbemonError::InvalidQuery { .. }));

        let range = TimeRange::last(Duration::from_secs(u64::MAX), NOW);
        assert_eq!(range.end, NOW);
        assert!(range.span_secs() > 0);
    }
}
