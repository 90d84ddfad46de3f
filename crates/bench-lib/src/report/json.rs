//! JSON run artifacts
//!
//! Key names are consumed by downstream comparison tooling and must stay
//! stable: `timestamp`, `duration_seconds`, `samples`, `summary` and the
//! summary keys (`avg_cpu_percent`, `estimated_power_watts`, ...).

use super::write_artifact;
use crate::error::{BenchError, Result};
use crate::models::RunReport;
use std::path::Path;

/// Serialize a report as pretty-printed JSON
pub fn to_json(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Parse a report from JSON
pub fn from_json(content: &str) -> serde_json::Result<RunReport> {
    serde_json::from_str(content)
}

impl RunReport {
    /// Write the report as JSON to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        write_artifact(path, &to_json(self)?)
    }

    /// Load a report previously written with [`RunReport::save`]
    pub fn load(path: &Path) -> Result<RunReport> {
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        from_json(&content).map_err(|source| BenchError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
