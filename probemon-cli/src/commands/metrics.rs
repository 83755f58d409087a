//! `probemon metrics` command

use anyhow::Result;
use probemon_core::{Config, GraphOptions, UnitPrefix};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "OPTIONS")]
    options: String,
    #[tabled(rename = "COMMAND")]
    command: String,
}

/// List configured metrics
pub fn metrics(config: &Config) -> Result<()> {
    let registry = config.registry()?;

    if registry.is_empty() {
        println!("No metrics configured");
        return Ok(());
    }

    let rows: Vec<MetricRow> = registry
        .metrics()
        .iter()
        .map(|m| MetricRow {
            name: m.name.to_string(),
            description: m.description.clone(),
            options: describe_options(&m.options),
            command: m.command.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{}", table);

    Ok(())
}

fn describe_options(options: &GraphOptions) -> String {
    let mut parts = Vec::new();
    if options.differentiate {
        parts.push("deriv".to_string());
    }
    match options.unit_prefix {
        UnitPrefix::Kilo => parts.push("kilo".to_string()),
        UnitPrefix::Kibi => parts.push("kibi".to_string()),
        UnitPrefix::None => {}
    }
    if options.no_downsample {
        parts.push("no_ds".to_string());
    }
    if let Some(y) = options.y_min {
        parts.push(format!("y_min={}", y));
    }
    if let Some(y) = options.y_max {
        parts.push(format!("y_max={}", y));
    }

    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(",")
    }
}
