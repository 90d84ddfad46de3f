//! Cross-environment comparison

use anyhow::{Context, Result};
use bench_lib::compare::{load_reports, Comparison, EnvironmentResult};
use bench_lib::report::{render_comparison_html, write_artifact};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;
use tracing::{debug, info};

use crate::output::{
    color_status, format_duration, format_percent, print_heading, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

/// Row for the comparison table
#[derive(Tabled, Serialize)]
struct ComparisonRow {
    #[tabled(rename = "Environment")]
    environment: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Avg CPU")]
    avg_cpu: String,
    #[tabled(rename = "Avg Memory")]
    avg_memory: String,
    #[tabled(rename = "Est. Power")]
    power: String,
    #[tabled(rename = "Est. Energy")]
    energy: String,
}

impl ComparisonRow {
    fn new(result: &EnvironmentResult, fastest: bool) -> Self {
        let environment = if fastest {
            format!("{} *", result.environment)
        } else {
            result.environment.clone()
        };
        Self {
            environment,
            status: color_status(result.interrupted),
            duration: format_duration(result.duration_seconds),
            samples: result.sample_count,
            avg_cpu: format_percent(result.avg_cpu_percent),
            avg_memory: format_percent(result.avg_memory_percent),
            power: format!("{:.2} W", result.estimated_power_watts),
            energy: format!("{:.4} Wh", result.estimated_energy_wh),
        }
    }
}

/// Compare the latest run of every environment found in `dir`
pub fn compare_dir(dir: &Path, html: Option<&Path>, format: OutputFormat) -> Result<()> {
    let loaded = load_reports(dir)
        .with_context(|| format!("Failed to read results directory {}", dir.display()))?;
    let comparison = Comparison::from_loaded(&loaded);
    info!(
        dir = %dir.display(),
        reports = loaded.len(),
        environments = comparison.results.len(),
        "Loaded run reports"
    );

    if let Some(path) = html {
        write_artifact(path, &render_comparison_html(&comparison)?)
            .with_context(|| format!("Failed to write comparison to {}", path.display()))?;
        debug!(path = %path.display(), "Comparison HTML written");
    }

    match format {
        OutputFormat::Json => print_json(&comparison)?,
        OutputFormat::Table => print_comparison(&comparison, dir),
    }

    if let (Some(path), OutputFormat::Table) = (html, format) {
        print_success(&format!("Comparison report written to {}", path.display()));
    }

    Ok(())
}

fn print_comparison(comparison: &Comparison, dir: &Path) {
    if comparison.is_empty() {
        print_warning(&format!("No run reports found in {}", dir.display()));
        return;
    }

    print_heading("Environment Comparison");

    let fastest = comparison.fastest.as_deref();
    let rows: Vec<ComparisonRow> = comparison
        .results
        .iter()
        .map(|r| ComparisonRow::new(r, fastest == Some(r.environment.as_str())))
        .collect();
    print_table(&rows, OutputFormat::Table);

    let winner = |label: &str, name: &Option<String>| {
        let name = name.as_deref().unwrap_or("N/A");
        println!("{:<24}{}", label, name.green().bold());
    };
    winner("Fastest:", &comparison.fastest);
    winner("Lowest avg CPU:", &comparison.lowest_cpu);
    winner("Lowest est. energy:", &comparison.lowest_energy);
}
