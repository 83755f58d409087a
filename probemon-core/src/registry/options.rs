//! Per-metric graph options.

use crate::binning::BinOp;
use crate::graph::UnitPrefix;
use std::str::FromStr;

/// Display and aggregation flags attached to a metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphOptions {
    /// Graph the discrete derivative instead of the value.
    pub differentiate: bool,
    /// Axis label unit prefix mode.
    pub unit_prefix: UnitPrefix,
    /// Never thin rows at query time for this metric.
    pub no_downsample: bool,
    /// Fixed y-axis lower bound.
    pub y_min: Option<f64>,
    /// Fixed y-axis upper bound.
    pub y_max: Option<f64>,
}

impl GraphOptions {
    /// The per-bin transform these options select.
    pub fn bin_op(&self) -> BinOp {
        if self.differentiate {
            BinOp::Derivative
        } else {
            BinOp::Identity
        }
    }
}

impl FromStr for GraphOptions {
    /// Every problem found, not just the first.
    type Err = Vec<String>;

    /// Parse `deriv`, `kilo`, `kibi`, `no_ds`, `y_min=<f64>`, `y_max=<f64>`,
    /// comma separated and case-insensitive. Empty items are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = GraphOptions::default();
        let mut errors = Vec::new();
        let mut kilo = false;
        let mut kibi = false;

        for item in s.trim().split(',') {
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k, Some(v.trim())),
                None => (item, None),
            };
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }

            match key.as_str() {
                "deriv" => options.differentiate = true,
                "kilo" => kilo = true,
                "kibi" => kibi = true,
                "no_ds" => options.no_downsample = true,
                "y_min" | "y_max" => {
                    let parsed = value
                        .ok_or_else(|| format!("{} needs a value", key))
                        .and_then(|v| {
                            v.parse::<f64>().map_err(|e| format!("bad {} value {:?}: {}", key, v, e))
                        });
                    match parsed {
                        Ok(v) if key == "y_min" => options.y_min = Some(v),
                        Ok(v) => options.y_max = Some(v),
                        Err(e) => errors.push(e),
                    }
                }
                other => errors.push(format!("unrecognized graph option: {}", other)),
            }
        }

        options.unit_prefix = match (kilo, kibi) {
            (true, true) => {
                errors.push("kilo and kibi are mutually exclusive".to_string());
                UnitPrefix::None
            }
            (true, false) => UnitPrefix::Kilo,
            (false, true) => UnitPrefix::Kibi,
            (false, false) => UnitPrefix::None,
        };

        if errors.is_empty() {
            Ok(options)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let table = [
            ("", GraphOptions::default()),
            ("deriv", GraphOptions { differentiate: true, ..Default::default() }),
            ("kibi", GraphOptions { unit_prefix: UnitPrefix::Kibi, ..Default::default() }),
            (
                "kilo,no_ds",
                GraphOptions {
                    unit_prefix: UnitPrefix::Kilo,
                    no_downsample: true,
                    ..Default::default()
                },
            ),
            (
                "y_min=-10, y_max = 20.5 ",
                GraphOptions { y_min: Some(-10.0), y_max: Some(20.5), ..Default::default() },
            ),
            ("DERIV,,", GraphOptions { differentiate: true, ..Default::default() }),
        ];

        for (give, want) in table {
            let got: GraphOptions = give.parse().unwrap_or_else(|e| panic!("{:?}: {:?}", give, e));
            assert_eq!(got, want, "options {:?}", give);
        }
    }

    #[test]
    fn test_parse_options_collects_all_errors() {
        let errors = "y_min=abc,wat,y_max".parse::<GraphOptions>().unwrap_err();
        assert_eq!(errors.len(), 3, "{:?}", errors);
    }

    #[test]
    fn test_kilo_and_kibi_conflict() {
        assert!("kilo,kibi".parse::<GraphOptions>().is_err());
    }

    #[test]
    fn test_bin_op_selection() {
        assert_eq!(GraphOptions::default().bin_op(), BinOp::Identity);
        let deriv = GraphOptions { differentiate: true, ..Default::default() };
        assert_eq!(deriv.bin_op(), BinOp::Derivative);
    }
}
