//! Axis label formatting.

use serde::{Deserialize, Serialize};

const SI_SUFFIXES: [&str; 6] = ["", "k", "M", "G", "T", "P"];
const BINARY_SUFFIXES: [&str; 6] = ["", "Ki", "Mi", "Gi", "Ti", "Pi"];

/// How axis values are scaled for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPrefix {
    /// Plain numbers.
    #[default]
    None,
    /// Powers of 1000: k, M, G, T, P.
    Kilo,
    /// Powers of 1024: Ki, Mi, Gi, Ti, Pi.
    Kibi,
}

impl UnitPrefix {
    /// Format `value` with at most two decimals and the largest fitting suffix.
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let (base, suffixes) = match self {
            UnitPrefix::None => return trim_decimals(format!("{:.3}", value)),
            UnitPrefix::Kilo => (1000.0, &SI_SUFFIXES),
            UnitPrefix::Kibi => (1024.0, &BINARY_SUFFIXES),
        };

        let mut scaled = value;
        let mut power = 0;
        while scaled.abs() >= base && power < suffixes.len() - 1 {
            scaled /= base;
            power += 1;
        }

        format!("{}{}", trim_decimals(format!("{:.2}", scaled)), suffixes[power])
    }
}

fn trim_decimals(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
