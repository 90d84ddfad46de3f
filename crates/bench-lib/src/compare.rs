//! Cross-environment comparison of run reports

use crate::error::{BenchError, Result};
use crate::models::RunReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A report together with the file it was read from
#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub path: PathBuf,
    pub report: RunReport,
}

/// The figures of one environment's run that take part in a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentResult {
    pub environment: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub sample_count: usize,
    pub avg_cpu_percent: f64,
    pub max_cpu_percent: f64,
    pub avg_memory_percent: f64,
    pub estimated_power_watts: f64,
    pub estimated_energy_wh: f64,
    pub interrupted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl EnvironmentResult {
    fn from_report(report: &RunReport, source: Option<PathBuf>) -> Self {
        let s = &report.summary;
        Self {
            environment: report.environment().to_string(),
            timestamp: report.metadata.started_at,
            duration_seconds: report.duration_seconds,
            sample_count: s.sample_count,
            avg_cpu_percent: s.avg_cpu_percent,
            max_cpu_percent: s.max_cpu_percent,
            avg_memory_percent: s.avg_memory_percent,
            estimated_power_watts: s.estimated_power_watts,
            estimated_energy_wh: s.estimated_energy_wh,
            interrupted: report.interrupted,
            source,
        }
    }
}

/// Latest run per environment plus the winners in each category
#[derive(Debug, Clone, Default, Serialize)]
pub struct Comparison {
    /// Sorted by environment name
    pub results: Vec<EnvironmentResult>,
    pub fastest: Option<String>,
    pub lowest_cpu: Option<String>,
    pub lowest_energy: Option<String>,
}

impl Comparison {
    pub fn from_reports(reports: &[RunReport]) -> Self {
        Self::from_results(
            reports
                .iter()
                .map(|r| EnvironmentResult::from_report(r, None)),
        )
    }

    pub fn from_loaded(loaded: &[LoadedReport]) -> Self {
        Self::from_results(
            loaded
                .iter()
                .map(|l| EnvironmentResult::from_report(&l.report, Some(l.path.clone()))),
        )
    }

    fn from_results(results: impl Iterator<Item = EnvironmentResult>) -> Self {
        let mut latest: BTreeMap<String, EnvironmentResult> = BTreeMap::new();
        for result in results {
            let superseded = latest
                .get(&result.environment)
                .is_some_and(|existing| existing.timestamp >= result.timestamp);
            if superseded {
                debug!(environment = %result.environment, "Ignoring older run for environment");
                continue;
            }
            latest.insert(result.environment.clone(), result);
        }

        // BTreeMap iteration keeps results sorted, so a strict `<` keeps the
        // alphabetically first environment on ties
        let results: Vec<EnvironmentResult> = latest.into_values().collect();
        let fastest = min_by(&results, |r| r.duration_seconds);
        let lowest_cpu = min_by(&results, |r| r.avg_cpu_percent);
        let lowest_energy = min_by(&results, |r| r.estimated_energy_wh);

        Self {
            results,
            fastest,
            lowest_cpu,
            lowest_energy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn min_by(results: &[EnvironmentResult], key: impl Fn(&EnvironmentResult) -> f64) -> Option<String> {
    let mut best: Option<&EnvironmentResult> = None;
    for result in results {
        match best {
            Some(current) if key(result) >= key(current) => {}
            _ => best = Some(result),
        }
    }
    best.map(|r| r.environment.clone())
}

/// Load every `*.json` report in `dir`
///
/// Files that cannot be read or parsed are skipped with a warning. Only a
/// failure to list the directory itself is an error.
pub fn load_reports(dir: &Path) -> Result<Vec<LoadedReport>> {
    let entries = std::fs::read_dir(dir).map_err(|source| BenchError::ReadFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        match RunReport::load(&path) {
            Ok(report) => loaded.push(LoadedReport { path, report }),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
        }
    }

    Ok(loaded)
}
