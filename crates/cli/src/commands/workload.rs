//! Hash-chain workload runner

use anyhow::{Context, Result};
use bench_lib::counters::{create_source, DEFAULT_CPU_WINDOW};
use bench_lib::report::write_artifact;
use bench_lib::workload::{Intensity, WorkloadBenchmark};
use std::path::Path;
use std::time::Duration;

use crate::output::{
    color_cpu, format_duration, print_heading, print_json, print_success, OutputFormat,
};

/// Run the workload and report what it did
pub async fn run_workload(
    duration_secs: u64,
    intensity: Intensity,
    proc_root: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let benchmark = WorkloadBenchmark::new(Duration::from_secs(duration_secs), intensity)?;
    let mut source = create_source(proc_root, DEFAULT_CPU_WINDOW).await;
    tracing::debug!(source = source.name(), "Workload counter source ready");

    let result = benchmark.run(source.as_mut()).await;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        write_artifact(path, &json)
            .with_context(|| format!("Failed to write workload results to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Workload results written");
    }

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_heading(&format!("Workload ({})", result.intensity));
            println!("CPU cores:       {}", result.cpu_count);
            println!("Duration:        {}", format_duration(result.duration_seconds));
            println!("Iterations:      {}", result.iterations);
            println!("Iterations/sec:  {:.2}", result.iterations_per_sec);
            println!(
                "CPU avg/min/max: {} / {} / {}",
                color_cpu(result.stats.cpu_avg),
                color_cpu(result.stats.cpu_min),
                color_cpu(result.stats.cpu_max)
            );
            println!(
                "Memory avg/max:  {:.1} / {:.1} MB",
                result.stats.memory_avg_mb, result.stats.memory_max_mb
            );
        }
    }

    if let (Some(path), OutputFormat::Table) = (output, format) {
        print_success(&format!("Workload results written to {}", path.display()));
    }

    Ok(())
}
