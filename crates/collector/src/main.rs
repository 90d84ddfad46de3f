//! bench-collector - one resource sampling run per invocation
//!
//! Samples host CPU, memory, disk and network usage for a fixed duration
//! and writes the run as JSON, plus optional HTML and text exposition.

use anyhow::{Context, Result};
use bench_lib::{
    counters::create_source,
    models::RunReport,
    observability::{SamplerMetrics, StructuredLogger},
    report::{render_exposition, render_run_html, write_artifact},
    sampler::SamplerBuilder,
    summary::EnergyModel,
};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{CollectorConfig, Overrides};

#[derive(Parser, Debug)]
#[command(name = "bench-collector")]
#[command(about = "Sample host resource usage for one benchmark run", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, env = "COLLECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Environment label for the run
    #[arg(short, long)]
    environment: Option<String>,

    /// Run duration in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Sampling interval in seconds
    #[arg(short, long)]
    interval: Option<f64>,

    /// CPU measurement window in milliseconds
    #[arg(long)]
    cpu_window_ms: Option<u64>,

    /// Assumed TDP in watts for the energy estimate
    #[arg(long)]
    tdp_watts: Option<f64>,

    /// JSON report path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write an HTML report
    #[arg(long)]
    html_output: Option<PathBuf>,

    /// Also write a Prometheus text exposition
    #[arg(long)]
    exposition_output: Option<PathBuf>,

    /// procfs mount point
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Print the collector's own metrics after the run
    #[arg(long)]
    self_metrics: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            environment: self.environment.clone(),
            duration_secs: self.duration,
            interval_secs: self.interval,
            cpu_window_ms: self.cpu_window_ms,
            tdp_watts: self.tdp_watts,
            output: self.output.clone(),
            html_output: self.html_output.clone(),
            exposition_output: self.exposition_output.clone(),
            proc_root: self.proc_root.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = CollectorConfig::load(args.config.as_deref(), &args.overrides())?;
    info!(
        environment = %config.environment,
        duration_secs = config.duration_secs,
        interval_secs = config.interval_secs,
        "Collector configured"
    );

    let source = create_source(&config.proc_root, config.cpu_window()).await;
    let mut sampler = SamplerBuilder::new()
        .source(source)
        .environment(config.environment.clone())
        .duration(config.duration())
        .interval(config.interval()?)
        .energy(EnergyModel::new(config.tdp_watts))
        .build()
        .context("Invalid sampling configuration")?;

    // Ctrl-C stops the run between ticks; collected samples are kept
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let report = sampler.run(shutdown_rx).await?;
    write_artifacts(&config, &report)?;
    print_summary(&report, &config);

    if args.self_metrics {
        print!("{}", SamplerMetrics::new().gather_text()?);
    }

    Ok(())
}

fn write_artifacts(config: &CollectorConfig, report: &RunReport) -> Result<()> {
    let logger = StructuredLogger::new(report.environment());

    report
        .save(&config.output)
        .with_context(|| format!("Failed to write JSON report to {}", config.output.display()))?;
    logger.log_artifact_written("json", &config.output);

    if let Some(path) = &config.html_output {
        write_artifact(path, &render_run_html(report)?)
            .with_context(|| format!("Failed to write HTML report to {}", path.display()))?;
        logger.log_artifact_written("html", path);
    }

    if let Some(path) = &config.exposition_output {
        let text = render_exposition(std::slice::from_ref(report))?;
        write_artifact(path, &text)
            .with_context(|| format!("Failed to write exposition to {}", path.display()))?;
        logger.log_artifact_written("exposition", path);
    }

    Ok(())
}

fn print_summary(report: &RunReport, config: &CollectorConfig) {
    let s = &report.summary;

    println!("Environment:      {}", report.environment());
    if report.interrupted {
        println!("Status:           interrupted");
    }
    println!("Duration:         {:.2}s", report.duration_seconds);
    println!("Samples:          {}", s.sample_count);
    println!("Avg CPU:          {:.2}%", s.avg_cpu_percent);
    println!("Max CPU:          {:.2}%", s.max_cpu_percent);
    println!("Avg memory:       {:.2}%", s.avg_memory_percent);
    println!("Disk read/write:  {:.3} / {:.3} MB", s.total_disk_read_mb, s.total_disk_write_mb);
    println!("Net sent/recv:    {:.3} / {:.3} MB", s.total_net_sent_mb, s.total_net_recv_mb);
    println!(
        "Est. power:       {:.2} W (TDP {:.0} W, estimate)",
        s.estimated_power_watts, s.assumed_tdp_watts
    );
    println!(
        "Est. energy:      {:.2} J / {:.4} Wh",
        s.estimated_energy_joules, s.estimated_energy_wh
    );
    println!("Report:           {}", config.output.display());
}
