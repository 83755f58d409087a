//! `probemon validate` command

use anyhow::Result;
use probemon_core::Config;

/// Validate the configuration and report what would run.
pub fn validate(config: &Config) -> Result<()> {
    config.validate()?;
    let registry = config.registry()?;

    println!("Configuration OK");
    println!("  database:        {}", config.db_path);
    println!("  shell:           {}", config.shell);
    println!("  measure period:  {:?}", config.measure_period());
    println!("  retention:       {:?}", config.retention());
    println!("  prune period:    {:?}", config.prune_period());
    println!("  metrics:         {}", registry.len());

    Ok(())
}
