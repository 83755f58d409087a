//! Running one metric's shell pipeline.

use crate::error::{ProbemonError, Result};
use crate::registry::MetricSpec;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run `<shell> -c <command>` and parse its trimmed stdout as a finite number.
///
/// The child is killed if it outlives `timeout` or if the returned future
/// is dropped.
pub async fn run_probe(shell: &str, metric: &MetricSpec, timeout: Duration) -> Result<f64> {
    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(&metric.command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ProbemonError::ProbeTimeout { metric: metric.name.to_string(), timeout })?
        .map_err(|e| ProbemonError::ProbeFailed {
            metric: metric.name.to_string(),
            reason: format!("failed to run {}: {}", shell, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbemonError::ProbeFailed {
            metric: metric.name.to_string(),
            reason: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    let cleaned = String::from_utf8_lossy(&output.stdout).trim().to_string();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
        ProbemonError::ProbeOutputNotNumeric { metric: metric.name.to_string(), output: cleaned.clone() }
    })
}
