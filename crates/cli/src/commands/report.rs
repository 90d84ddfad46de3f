//! Commands that work on saved run reports

use anyhow::{Context, Result};
use bench_lib::models::{RunReport, Sample};
use bench_lib::report::{render_exposition, render_run_html, write_artifact};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::output::{
    color_cpu, color_status, format_duration, format_mb, format_percent, format_timestamp,
    print_heading, print_info, print_json, print_success, print_table, OutputFormat,
};

/// Row for the summary table
#[derive(Tabled, Serialize)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn metric(metric: &'static str, value: String) -> MetricRow {
    MetricRow { metric, value }
}

/// Row for the per-sample table
#[derive(Tabled, Serialize)]
struct SampleRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk R/W")]
    disk: String,
    #[tabled(rename = "Net Tx/Rx")]
    network: String,
    #[tabled(rename = "Unavailable")]
    unavailable: String,
}

impl From<&Sample> for SampleRow {
    fn from(sample: &Sample) -> Self {
        Self {
            time: sample.timestamp.format("%H:%M:%S%.3f").to_string(),
            cpu: format_percent(sample.cpu_percent),
            memory: format_percent(sample.memory_percent),
            disk: format!(
                "{} / {}",
                format_mb(sample.disk_read_mb),
                format_mb(sample.disk_write_mb)
            ),
            network: format!(
                "{} / {}",
                format_mb(sample.net_sent_mb),
                format_mb(sample.net_recv_mb)
            ),
            unavailable: sample.unavailable.join(", "),
        }
    }
}

fn load(path: &Path) -> Result<RunReport> {
    RunReport::load(path).with_context(|| format!("Failed to load report {}", path.display()))
}

/// Show one run report
pub fn show_report(file: &Path, samples: bool, format: OutputFormat) -> Result<()> {
    let report = load(file)?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    let s = &report.summary;
    let meta = &report.metadata;

    print_heading(&format!("Run: {}", report.environment()));
    println!("Started:     {}", format_timestamp(&meta.started_at));
    println!("Status:      {}", color_status(report.interrupted));
    println!(
        "Duration:    {} (configured {})",
        format_duration(report.duration_seconds),
        format_duration(meta.configured_duration_seconds)
    );
    println!("Interval:    {}", format_duration(meta.interval_seconds));
    if let Some(host) = &meta.hostname {
        println!("Host:        {}", host.cyan());
    }
    if let Some(kernel) = &meta.kernel {
        println!("Kernel:      {}", kernel);
    }
    println!();

    let rows = vec![
        metric("Samples", s.sample_count.to_string()),
        metric("Avg CPU", color_cpu(s.avg_cpu_percent)),
        metric("Max CPU", color_cpu(s.max_cpu_percent)),
        metric("Avg memory", format_percent(s.avg_memory_percent)),
        metric("Max memory", format_percent(s.max_memory_percent)),
        metric("Disk read", format_mb(s.total_disk_read_mb)),
        metric("Disk written", format_mb(s.total_disk_write_mb)),
        metric("Network sent", format_mb(s.total_net_sent_mb)),
        metric("Network received", format_mb(s.total_net_recv_mb)),
        metric("Est. power", format!("{:.2} W", s.estimated_power_watts)),
        metric(
            "Est. energy",
            format!(
                "{:.2} J / {:.4} Wh",
                s.estimated_energy_joules, s.estimated_energy_wh
            ),
        ),
    ];
    print_table(&rows, format);

    println!(
        "{}",
        format!(
            "Energy is an estimate: {:.0} W TDP scaled by average CPU ({})",
            s.assumed_tdp_watts, s.estimation_method
        )
        .dimmed()
    );

    if samples {
        println!();
        let rows: Vec<SampleRow> = report.samples.iter().map(SampleRow::from).collect();
        print_table(&rows, format);
    } else {
        print_info("Use --samples to list every sample");
    }

    Ok(())
}

/// Render a saved report as HTML
pub fn render_report(file: &Path, output: &Path) -> Result<()> {
    let report = load(file)?;
    let html = render_run_html(&report)?;
    write_artifact(output, &html)
        .with_context(|| format!("Failed to write HTML report to {}", output.display()))?;

    print_success(&format!("HTML report written to {}", output.display()));
    Ok(())
}

/// Export one or more reports as Prometheus text exposition
pub fn export_reports(files: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let reports = files
        .iter()
        .map(|path| load(path))
        .collect::<Result<Vec<_>>>()?;
    let text = render_exposition(&reports)?;
    tracing::info!(reports = reports.len(), bytes = text.len(), "Rendered exposition");

    match output {
        Some(path) => {
            write_artifact(path, &text)
                .with_context(|| format!("Failed to write exposition to {}", path.display()))?;
            print_success(&format!(
                "Exported {} report(s) to {}",
                reports.len(),
                path.display()
            ));
        }
        None => print!("{}", text),
    }

    Ok(())
}
