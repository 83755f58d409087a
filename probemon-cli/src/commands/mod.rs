//! CLI command implementations

pub mod metrics;
pub mod series;
pub mod validate;

pub use metrics::metrics;
pub use series::series;
pub use validate::validate;

use anyhow::{Context, Result};
use probemon_core::Config;
use std::path::Path;

/// Load the configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}
