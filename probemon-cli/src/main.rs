use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "probemon")]
#[command(about = "Inspect probemon metrics and their stored series", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: $PROBEMON_CONFIG or <data dir>/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration and metric definitions
    Validate,

    /// List configured metrics
    Metrics,

    /// Print a binned series for one metric
    Series {
        /// Metric name
        metric: String,

        /// Relative range such as `last-1h` or `last-1.5h`
        #[arg(short, long, conflicts_with_all = ["start", "end"])]
        time: Option<String>,

        /// Range start, unix seconds
        #[arg(long, requires = "end")]
        start: Option<i64>,

        /// Range end, unix seconds
        #[arg(long, requires = "start")]
        end: Option<i64>,

        /// Read every row instead of a statistical sample
        #[arg(long)]
        no_downsample: bool,

        /// Print JSON for an external renderer instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate => commands::validate(&config),
        Commands::Metrics => commands::metrics(&config),
        Commands::Series { metric, time, start, end, no_downsample, json } => {
            let range = commands::series::resolve_range(
                time.as_deref(),
                start.zip(end),
                config.default_graph_period(),
                probemon_core::graph::unix_now(),
            )?;
            commands::series(&config, metric, range, no_downsample, json).await
        }
    }
}
