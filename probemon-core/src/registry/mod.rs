//! Metric registry: the validated, immutable set of metric definitions.
//!
//! A metric name is interpolated directly into SQL table and index
//! identifiers, so it can only be obtained through [`MetricName::parse`].
//! Everything downstream of the registry holds `Arc<MetricSpec>` references
//! and trusts the name.

mod options;

pub use options::GraphOptions;

use crate::error::{ProbemonError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix shared by every per-metric table.
pub const TABLE_PREFIX: &str = "probemon_metric";

/// Metric name validation regex.
static METRIC_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-_A-Za-z0-9]{1,512}$").expect("Invalid metric name regex"));

/// A metric name that has passed identifier validation.
///
/// This is the only value ever spliced into SQL text. Validated names never
/// contain quotes, so the double-quoted identifiers below cannot be escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MetricName(String);

impl MetricName {
    /// Check a candidate name against the identifier pattern.
    pub fn is_valid(name: &str) -> bool {
        METRIC_NAME_REGEX.is_match(name)
    }

    /// Validate a single name.
    pub fn parse(name: &str) -> Result<Self> {
        if Self::is_valid(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(ProbemonError::InvalidMetricNames { names: vec![name.to_string()] })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted table identifier, e.g. `"probemon_metric_load"`.
    pub fn table_ident(&self) -> String {
        format!("\"{}_{}\"", TABLE_PREFIX, self.0)
    }

    /// Quoted index identifier, e.g. `"index_probemon_metric_load"`.
    pub fn index_ident(&self) -> String {
        format!("\"index_{}_{}\"", TABLE_PREFIX, self.0)
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated metric definition as supplied by configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated graph options, e.g. `deriv,kilo,y_min=0`.
    #[serde(default)]
    pub options: String,
    /// Shell pipeline handed verbatim to `<shell> -c`.
    pub command: String,
}

/// A validated metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub name: MetricName,
    pub description: String,
    pub command: String,
    pub options: GraphOptions,
}

/// Validated, ordered list of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    metrics: Vec<Arc<MetricSpec>>,
}

impl MetricRegistry {
    /// Check every definition's name, reporting all offenders at once.
    pub fn validate(definitions: &[MetricDefinition]) -> Result<()> {
        let total = definitions.len();
        let mut invalid = Vec::new();
        for (n, def) in definitions.iter().enumerate() {
            debug!("Validating metric name {}/{}: {}", n + 1, total, def.name);
            if !MetricName::is_valid(&def.name) {
                warn!(metric = %def.name, "Metric name is not valid");
                invalid.push(def.name.clone());
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(ProbemonError::InvalidMetricNames { names: invalid })
        }
    }

    /// Build the registry from configuration definitions.
    ///
    /// Name validation runs first and is fatal on its own; option parsing
    /// errors and duplicate names are reported afterwards.
    pub fn from_definitions(definitions: Vec<MetricDefinition>) -> Result<Self> {
        Self::validate(&definitions)?;

        let mut seen = HashSet::new();
        let mut metrics = Vec::with_capacity(definitions.len());
        for def in definitions {
            if !seen.insert(def.name.clone()) {
                return Err(ProbemonError::InvalidConfig {
                    reason: format!("metric {} is defined more than once", def.name),
                });
            }

            let options = def.options.parse::<GraphOptions>().map_err(|reasons| {
                ProbemonError::InvalidGraphOption {
                    metric: def.name.clone(),
                    reason: reasons.join("; "),
                }
            })?;

            metrics.push(Arc::new(MetricSpec {
                name: MetricName(def.name),
                description: def.description,
                command: def.command,
                options,
            }));
        }

        Ok(Self { metrics })
    }

    /// All metrics in configuration order.
    pub fn metrics(&self) -> &[Arc<MetricSpec>] {
        &self.metrics
    }

    /// Look up a metric by its name.
    pub fn find(&self, name: &str) -> Option<Arc<MetricSpec>> {
        self.metrics.iter().find(|m| m.name.as_str() == name).cloned()
    }

    /// Like [`find`](Self::find), but an unknown name is a query error.
    pub fn get(&self, name: &str) -> Result<Arc<MetricSpec>> {
        self.find(name).ok_or_else(|| ProbemonError::UnknownMetric { name: name.to_string() })
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str) -> MetricDefinition {
        MetricDefinition {
            name: name.to_string(),
            description: format!("{} description", name),
            options: String::new(),
            command: "echo 1".to_string(),
        }
    }

    #[test]
    fn test_valid_names() {
        let long = "x".repeat(512);
        let valid = [
            "some_metric_1",
            "another_metric",
            "good",
            "yezzz_1010101",
            "verylooooooooooOOOOOOOOOOOOOOOOOOOOOOoooooooooong_name",
            "mittari",
            "1231903",
            "abc-",
            "-",
            long.as_str(),
        ];
        for name in valid {
            assert!(MetricName::is_valid(name), "should be valid: {}", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "x".repeat(513);
        let invalid = [
            "",
            "'",
            "\"",
            " ",
            ";",
            "name\n",
            "';delete from sqlite_master where type in ('view', 'table', 'index', 'trigger');",
            "';DROP TABLE BOO;",
            r#"<a href="badsite.example.com">click here now to win prize</a>"#,
            r#"<script>alert("AAAA")</script>"#,
            "ümlaut",
            too_long.as_str(),
        ];
        for name in invalid {
            assert!(!MetricName::is_valid(name), "should be invalid: {:?}", name);
        }
    }

    #[test]
    fn test_identifiers_are_quoted() {
        let name = MetricName::parse("disk-used").unwrap();
        assert_eq!(name.table_ident(), "\"probemon_metric_disk-used\"");
        assert_eq!(name.index_ident(), "\"index_probemon_metric_disk-used\"");
    }

    #[test]
    fn test_validate_reports_all_offenders() {
        let defs = vec![def("ok"), def("bad name"), def("fine_too"), def("x;y")];
        match MetricRegistry::validate(&defs) {
            Err(ProbemonError::InvalidMetricNames { names }) => {
                assert_eq!(names, vec!["bad name".to_string(), "x;y".to_string()]);
            }
            other => panic!("expected InvalidMetricNames, got {:?}", other),
        }
    }

    #[test]
    fn test_from_definitions_preserves_order() {
        let registry =
            MetricRegistry::from_definitions(vec![def("b"), def("a"), def("c")]).unwrap();
        let names: Vec<_> = registry.metrics().iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(registry.find("a").is_some());
        assert!(registry.find("zzz").is_none());
        assert!(matches!(registry.get("zzz"), Err(ProbemonError::UnknownMetric { .. })));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = MetricRegistry::from_definitions(vec![def("a"), def("a")]);
        assert!(matches!(result, Err(ProbemonError::InvalidConfig { .. })));
    }

    #[test]
    fn test_bad_options_rejected() {
        let mut d = def("a");
        d.options = "deriv,sparkles".to_string();
        let result = MetricRegistry::from_definitions(vec![d]);
        assert!(matches!(result, Err(ProbemonError::InvalidGraphOption { .. })));
    }
}
