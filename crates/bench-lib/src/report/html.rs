//! HTML rendering through minijinja templates
//!
//! Reports are first assembled into plain view models (formatted strings,
//! placeholders already substituted) and then handed to an auto-escaping
//! template environment, so free-text fields such as the environment label
//! can never inject markup.

use crate::compare::Comparison;
use crate::error::Result;
use crate::models::{RunReport, Sample};
use chrono::{DateTime, Utc};
use minijinja::{context, Environment};
use serde::Serialize;

/// Placeholder for fields a report does not carry
pub const NOT_AVAILABLE: &str = "N/A";

const RUN_TEMPLATE: &str = "run.html";
const COMPARISON_TEMPLATE: &str = "comparison.html";

fn templates() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template(RUN_TEMPLATE, include_str!("templates/run.html"))?;
    env.add_template(COMPARISON_TEMPLATE, include_str!("templates/comparison.html"))?;
    Ok(env)
}

fn or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    label: &'static str,
    value: String,
}

fn row(label: &'static str, value: String) -> SummaryRow {
    SummaryRow { label, value }
}

#[derive(Debug, Serialize)]
struct SampleRow {
    index: usize,
    timestamp: String,
    cpu_percent: String,
    memory_percent: String,
    memory_used_mb: String,
    disk_read_mb: String,
    disk_write_mb: String,
    net_sent_mb: String,
    net_recv_mb: String,
    unavailable: String,
}

impl SampleRow {
    fn new(index: usize, sample: &Sample) -> Self {
        Self {
            index: index + 1,
            timestamp: sample.timestamp.format("%H:%M:%S%.3f").to_string(),
            cpu_percent: format!("{:.1}", sample.cpu_percent),
            memory_percent: format!("{:.1}", sample.memory_percent),
            memory_used_mb: format!("{:.0}", sample.memory_used_mb),
            disk_read_mb: format!("{:.3}", sample.disk_read_mb),
            disk_write_mb: format!("{:.3}", sample.disk_write_mb),
            net_sent_mb: format!("{:.3}", sample.net_sent_mb),
            net_recv_mb: format!("{:.3}", sample.net_recv_mb),
            unavailable: sample.unavailable.join(", "),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunView {
    environment: String,
    started_at: String,
    duration_seconds: String,
    configured_duration_seconds: String,
    interval_seconds: String,
    hostname: String,
    kernel: String,
    interrupted: bool,
    summary: Vec<SummaryRow>,
    assumed_tdp_watts: String,
    estimation_method: String,
    samples: Vec<SampleRow>,
}

impl RunView {
    fn new(report: &RunReport) -> Self {
        let s = &report.summary;
        let summary = vec![
            row("Samples", s.sample_count.to_string()),
            row("Average CPU", format!("{:.1}%", s.avg_cpu_percent)),
            row("Peak CPU", format!("{:.1}%", s.max_cpu_percent)),
            row("Average memory", format!("{:.1}%", s.avg_memory_percent)),
            row("Peak memory", format!("{:.1}%", s.max_memory_percent)),
            row("Disk read", format!("{:.3} MB", s.total_disk_read_mb)),
            row("Disk written", format!("{:.3} MB", s.total_disk_write_mb)),
            row("Network sent", format!("{:.3} MB", s.total_net_sent_mb)),
            row("Network received", format!("{:.3} MB", s.total_net_recv_mb)),
            row("Estimated power", format!("{:.2} W", s.estimated_power_watts)),
            row(
                "Estimated energy",
                format!(
                    "{:.2} J / {:.4} Wh",
                    s.estimated_energy_joules, s.estimated_energy_wh
                ),
            ),
        ];

        Self {
            environment: or_na(Some(report.environment())),
            started_at: format_timestamp(&report.metadata.started_at),
            duration_seconds: format!("{:.2}", report.duration_seconds),
            configured_duration_seconds: format!(
                "{:.2}",
                report.metadata.configured_duration_seconds
            ),
            interval_seconds: format!("{:.2}", report.metadata.interval_seconds),
            hostname: or_na(report.metadata.hostname.as_deref()),
            kernel: or_na(report.metadata.kernel.as_deref()),
            interrupted: report.interrupted,
            summary,
            assumed_tdp_watts: if s.assumed_tdp_watts > 0.0 {
                format!("{:.0}", s.assumed_tdp_watts)
            } else {
                NOT_AVAILABLE.to_string()
            },
            estimation_method: or_na(Some(s.estimation_method.as_str())),
            samples: report
                .samples
                .iter()
                .enumerate()
                .map(|(i, sample)| SampleRow::new(i, sample))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ComparisonRow {
    environment: String,
    timestamp: String,
    duration_seconds: String,
    sample_count: usize,
    avg_cpu_percent: String,
    avg_memory_percent: String,
    estimated_power_watts: String,
    estimated_energy_wh: String,
    status: &'static str,
    fastest: bool,
}

#[derive(Debug, Serialize)]
struct ComparisonView {
    rows: Vec<ComparisonRow>,
    fastest: String,
    lowest_cpu: String,
    lowest_energy: String,
    environment_count: usize,
}

impl ComparisonView {
    fn new(comparison: &Comparison) -> Self {
        let rows = comparison
            .results
            .iter()
            .map(|r| ComparisonRow {
                environment: r.environment.clone(),
                timestamp: format_timestamp(&r.timestamp),
                duration_seconds: format!("{:.2}", r.duration_seconds),
                sample_count: r.sample_count,
                avg_cpu_percent: format!("{:.1}", r.avg_cpu_percent),
                avg_memory_percent: format!("{:.1}", r.avg_memory_percent),
                estimated_power_watts: format!("{:.2}", r.estimated_power_watts),
                estimated_energy_wh: format!("{:.4}", r.estimated_energy_wh),
                status: if r.interrupted { "interrupted" } else { "completed" },
                fastest: comparison.fastest.as_deref() == Some(r.environment.as_str()),
            })
            .collect();

        Self {
            rows,
            fastest: or_na(comparison.fastest.as_deref()),
            lowest_cpu: or_na(comparison.lowest_cpu.as_deref()),
            lowest_energy: or_na(comparison.lowest_energy.as_deref()),
            environment_count: comparison.results.len(),
        }
    }
}

/// Render one run as a self-contained HTML page
pub fn render_run_html(report: &RunReport) -> Result<String> {
    let env = templates()?;
    let template = env.get_template(RUN_TEMPLATE)?;
    Ok(template.render(context! {
        run => RunView::new(report),
        generated_at => format_timestamp(&Utc::now()),
    })?)
}

/// Render a cross-environment comparison as a self-contained HTML page
pub fn render_comparison_html(comparison: &Comparison) -> Result<String> {
    let env = templates()?;
    let template = env.get_template(COMPARISON_TEMPLATE)?;
    Ok(template.render(context! {
        comparison => ComparisonView::new(comparison),
        generated_at => format_timestamp(&Utc::now()),
    })?)
}
