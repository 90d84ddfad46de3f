//! Resource benchmark CLI
//!
//! A command-line tool for inspecting, comparing and exporting the run
//! reports written by `bench-collector`, and for generating CPU load.

mod commands;
mod config;
mod output;

use anyhow::Result;
use bench_lib::workload::Intensity;
use clap::{Parser, Subcommand};
use commands::{compare, report, workload};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Resource benchmark CLI
#[derive(Parser)]
#[command(name = "rbench")]
#[command(author, version, about = "Inspect and compare resource benchmark runs", long_about = None)]
pub struct Cli {
    /// Output format (defaults to the configured default_format, then table)
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the summary of one run report
    Show {
        /// JSON report written by bench-collector
        file: PathBuf,

        /// Also list every sample
        #[arg(long)]
        samples: bool,
    },

    /// Compare the latest run of each environment in a directory
    Compare {
        /// Directory of JSON reports (defaults to the configured results_dir)
        dir: Option<PathBuf>,

        /// Also write an HTML comparison report
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Export reports as Prometheus text exposition
    Export {
        /// JSON reports to export
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Render a saved report as HTML
    Render {
        /// JSON report written by bench-collector
        file: PathBuf,

        /// HTML output path
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Run the CPU hash-chain workload
    Workload {
        /// Duration in seconds
        #[arg(long, short, env = "WORKLOAD_DURATION", default_value_t = 30)]
        duration: u64,

        /// light, medium or heavy
        #[arg(long, short, env = "WORKLOAD_INTENSITY", default_value = "medium")]
        intensity: Intensity,

        /// Write the results as JSON
        #[arg(long, short, env = "WORKLOAD_OUTPUT")]
        output: Option<PathBuf>,

        /// procfs mount point used for CPU and memory samples
        #[arg(long, default_value = "/proc")]
        proc_root: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format)?;

    // Execute command
    match cli.command {
        Commands::Show { file, samples } => {
            report::show_report(&file, samples, format)?;
        }
        Commands::Compare { dir, html } => {
            let dir = config.resolve_results_dir(dir);
            compare::compare_dir(&dir, html.as_deref(), format)?;
        }
        Commands::Export { files, output } => {
            report::export_reports(&files, output.as_deref())?;
        }
        Commands::Render { file, output } => {
            report::render_report(&file, &output)?;
        }
        Commands::Workload {
            duration,
            intensity,
            output,
            proc_root,
        } => {
            workload::run_workload(duration, intensity, &proc_root, output.as_deref(), format)
                .await?;
        }
    }

    Ok(())
}
