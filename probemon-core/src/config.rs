//! Configuration management.

use crate::error::{ProbemonError, Result};
use crate::graph::GraphSettings;
use crate::paths;
use crate::registry::{MetricDefinition, MetricRegistry};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persistent configuration for probemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: String,
    /// Shell used as `<shell> -c <command>` for every probe.
    pub shell: String,
    pub measure_period_secs: u64,
    pub retention_secs: u64,
    pub prune_period_secs: u64,
    /// Capacity of the queue in front of the storage writer.
    pub queue_capacity: usize,
    pub log_level: String,
    /// Serve Prometheus metrics on this address when set.
    pub metrics_listen_addr: Option<SocketAddr>,
    pub graph: GraphConfig,
    pub metrics: Vec<MetricDefinition>,
}

/// Read-path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Range shown when none is requested.
    pub default_period_secs: u64,
    pub bin_width_secs: u64,
    pub max_bins: usize,
    pub downsampling_scale: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: paths::db_path().to_string_lossy().to_string(),
            shell: "/bin/sh".to_string(),
            measure_period_secs: 60,
            retention_secs: 90 * 24 * 3600, // 90 days
            prune_period_secs: 15 * 60,
            queue_capacity: 64,
            log_level: "info".to_string(),
            metrics_listen_addr: None,
            graph: GraphConfig::default(),
            metrics: Vec::new(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { default_period_secs: 3600, bin_width_secs: 60, max_bins: 300, downsampling_scale: 1 }
    }
}

impl Config {
    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        paths::config_path()
    }

    /// Load configuration from the default location, falling back to
    /// defaults if no file exists there.
    pub fn load() -> Result<Self> {
        Self::load_or_default(Self::config_path())
    }

    fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load configuration from `path`, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ProbemonError::InvalidConfig {
            reason: format!("Failed to read config {}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ProbemonError::InvalidConfig {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Check periods and scales, then the metric definitions.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.measure_period_secs < 1 {
            problems.push("measure_period_secs must be at least 1");
        }
        if self.prune_period_secs < 1 {
            problems.push("prune_period_secs must be at least 1");
        }
        if self.retention_secs < 1 {
            problems.push("retention_secs must be at least 1");
        }
        if self.shell.trim().is_empty() {
            problems.push("shell must not be empty");
        }
        if self.graph.bin_width_secs < 1 {
            problems.push("graph.bin_width_secs must be at least 1");
        }
        if self.graph.max_bins < 1 {
            problems.push("graph.max_bins must be at least 1");
        }
        if self.graph.downsampling_scale < 1 {
            problems.push("graph.downsampling_scale must be at least 1");
        }
        if !problems.is_empty() {
            return Err(ProbemonError::InvalidConfig { reason: problems.join("; ") });
        }

        self.registry().map(|_| ())
    }

    /// Build the validated metric registry.
    pub fn registry(&self) -> Result<MetricRegistry> {
        MetricRegistry::from_definitions(self.metrics.clone())
    }

    pub fn measure_period(&self) -> Duration {
        Duration::from_secs(self.measure_period_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn prune_period(&self) -> Duration {
        Duration::from_secs(self.prune_period_secs)
    }

    pub fn default_graph_period(&self) -> Duration {
        Duration::from_secs(self.graph.default_period_secs)
    }

    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            bin_width: Duration::from_secs(self.graph.bin_width_secs),
            max_bins: self.graph.max_bins,
            downsampling_scale: self.graph.downsampling_scale,
            measure_period: self.measure_period(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "db_path": "/tmp/probemon-test.sqlite",
        "measure_period_secs": 15,
        "retention_secs": 604800,
        "graph": { "max_bins": 200, "downsampling_scale": 3 },
        "metrics": [
            {
                "name": "n_temp_files",
                "description": "Files in /tmp",
                "options": "y_min=0,kilo",
                "command": "find /tmp/ -type f | wc -l"
            },
            {
                "name": "n_processes",
                "options": "y_min=0,y_max=1000",
                "command": "ps -A | wc -l"
            }
        ]
    }"#;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.shell, "/bin/sh");
        assert_eq!(config.measure_period(), Duration::from_secs(60));
        assert_eq!(config.retention(), Duration::from_secs(90 * 86_400));
        assert_eq!(config.prune_period(), Duration::from_secs(900));
        assert_eq!(config.graph.bin_width_secs, 60);
        assert_eq!(config.graph.max_bins, 300);
        assert_eq!(config.graph.downsampling_scale, 1);
        assert!(config.metrics_listen_addr.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.measure_period_secs, 15);
        assert_eq!(config.retention_secs, 604_800);
        // Unset fields keep their defaults.
        assert_eq!(config.prune_period_secs, 900);
        assert_eq!(config.graph.bin_width_secs, 60);
        assert_eq!(config.graph.max_bins, 200);

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        let temp = registry.get("n_temp_files").unwrap();
        assert_eq!(temp.options.y_min, Some(0.0));
        assert_eq!(temp.options.unit_prefix, crate::graph::UnitPrefix::Kilo);
        assert_eq!(registry.get("n_processes").unwrap().options.y_max, Some(1000.0));

        let settings = config.graph_settings();
        assert_eq!(settings.measure_period, Duration::from_secs(15));
        assert_eq!(settings.downsampling_scale, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.measure_period_secs = 0;
        config.graph.downsampling_scale = 0;
        match config.validate() {
            Err(ProbemonError::InvalidConfig { reason }) => {
                assert!(reason.contains("measure_period_secs"));
                assert!(reason.contains("downsampling_scale"));
            }
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_metric_names() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.metrics[1].name = "n processes".to_string();
        assert!(matches!(config.validate(), Err(ProbemonError::InvalidMetricNames { .. })));
    }

    #[test]
    fn test_missing_default_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("nope.json")).unwrap();
        assert_eq!(config.queue_capacity, 64);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ProbemonError::InvalidConfig { .. }));
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.metrics.len(), 2);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ProbemonError::InvalidConfig { .. })));
    }
}
