//! Collector configuration
//!
//! Values are layered: built-in defaults, an optional config file, then
//! `COLLECTOR_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollectorConfig {
    /// Label recorded in the report (docker, microvm, unikernel, ...)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Total run length in seconds
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Sampling interval in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: f64,

    /// CPU measurement window in milliseconds
    #[serde(default = "default_cpu_window")]
    pub cpu_window_ms: u64,

    /// Assumed processor TDP for the energy estimate
    #[serde(default = "default_tdp")]
    pub tdp_watts: f64,

    /// JSON report path
    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default)]
    pub html_output: Option<PathBuf>,

    #[serde(default)]
    pub exposition_output: Option<PathBuf>,

    /// Where procfs is mounted
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

fn default_environment() -> String {
    "unknown".to_string()
}

fn default_duration() -> u64 {
    10
}

fn default_interval() -> f64 {
    1.0
}

fn default_cpu_window() -> u64 {
    100
}

fn default_tdp() -> f64 {
    bench_lib::summary::DEFAULT_TDP_WATTS
}

fn default_output() -> PathBuf {
    PathBuf::from("metrics.json")
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub environment: Option<String>,
    pub duration_secs: Option<u64>,
    pub interval_secs: Option<f64>,
    pub cpu_window_ms: Option<u64>,
    pub tdp_watts: Option<f64>,
    pub output: Option<PathBuf>,
    pub html_output: Option<PathBuf>,
    pub exposition_output: Option<PathBuf>,
    pub proc_root: Option<PathBuf>,
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

impl CollectorConfig {
    /// Load configuration from an optional file, the environment and flags
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::build(file, Environment::with_prefix("COLLECTOR"), overrides)
    }

    fn build(file: Option<&Path>, environment: Environment, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(environment.try_parsing(true))
            .set_override_option("environment", overrides.environment.clone())?
            .set_override_option("duration_secs", overrides.duration_secs)?
            .set_override_option("interval_secs", overrides.interval_secs)?
            .set_override_option("cpu_window_ms", overrides.cpu_window_ms)?
            .set_override_option("tdp_watts", overrides.tdp_watts)?
            .set_override_option("output", path_value(&overrides.output))?
            .set_override_option("html_output", path_value(&overrides.html_output))?
            .set_override_option("exposition_output", path_value(&overrides.exposition_output))?
            .set_override_option("proc_root", path_value(&overrides.proc_root))?
            .build()
            .context("Failed to assemble configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.interval_secs)
            .with_context(|| format!("Invalid interval_secs {}", self.interval_secs))
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }
}
