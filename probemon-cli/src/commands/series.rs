//! `probemon series` command

use anyhow::{bail, Result};
use probemon_core::graph::{build_series, SeriesRequest, TimeRange};
use probemon_core::{Config, SeriesStore};
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct BinRow {
    #[tabled(rename = "TIME")]
    time: i64,
    #[tabled(rename = "VALUE")]
    value: String,
}

/// Pick the range from `--time`, `--start/--end`, or the configured default.
pub fn resolve_range(
    expr: Option<&str>,
    explicit: Option<(i64, i64)>,
    default_period: Duration,
    now: i64,
) -> Result<TimeRange> {
    match (expr, explicit) {
        (Some(_), Some(_)) => bail!("--time cannot be combined with --start/--end"),
        (Some(expr), None) => Ok(TimeRange::parse_expr_at(expr, now)?),
        (None, Some((start, end))) => Ok(TimeRange::new(start, end)?),
        (None, None) => Ok(TimeRange::last(default_period, now)),
    }
}

/// Read, bin, and print one metric's series.
pub async fn series(
    config: &Config,
    metric: String,
    range: TimeRange,
    no_downsample: bool,
    json: bool,
) -> Result<()> {
    config.validate()?;
    let registry = config.registry()?;
    let store = SeriesStore::open(&config.db_path).await?;

    let request = SeriesRequest { metric, range, force_no_downsample: no_downsample };
    let series = build_series(&store, &registry, &request, &config.graph_settings()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    let rows: Vec<BinRow> = series
        .bins
        .iter()
        .map(|bin| BinRow {
            time: bin.label,
            value: if bin.value.is_nan() {
                "-".to_string()
            } else {
                series.unit_prefix.format(bin.value)
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    let (axis_min, axis_max) = series.axis_labels();
    println!("{} ({})", series.metric, series.description);
    println!("{}", table);
    println!(
        "{} rows in {} bins, axis {} .. {}",
        series.rows,
        series.bins.len(),
        axis_min,
        axis_max
    );

    Ok(())
}
