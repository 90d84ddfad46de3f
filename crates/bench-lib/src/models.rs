//! Core data models for a sampling run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// A single counter value that is either present or unavailable with a reason.
///
/// Keeps "genuinely zero" apart from "could not be read" until the value is
/// folded into a [`Sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Present(T),
    Unavailable(String),
}

impl<T: Copy + Default> Reading<T> {
    /// The value, or `T::default()` if the counter was unavailable
    pub fn value_or_zero(&self) -> T {
        match self {
            Reading::Present(v) => *v,
            Reading::Unavailable(_) => T::default(),
        }
    }

    pub fn value(&self) -> Option<T> {
        match self {
            Reading::Present(v) => Some(*v),
            Reading::Unavailable(_) => None,
        }
    }
}

impl<T> Reading<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Reading::Present(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Reading::Present(_) => None,
            Reading::Unavailable(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Present(v) => Reading::Present(f(v)),
            Reading::Unavailable(reason) => Reading::Unavailable(reason),
        }
    }
}

impl<T> From<Result<T, BenchError>> for Reading<T> {
    fn from(result: Result<T, BenchError>) -> Self {
        match result {
            Ok(v) => Reading::Present(v),
            Err(e) => Reading::Unavailable(e.to_string()),
        }
    }
}

/// One timestamped measurement of system resource usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: f64,
    pub memory_available_mb: f64,
    /// Cumulative since sampler start
    pub disk_read_mb: f64,
    pub disk_write_mb: f64,
    pub net_sent_mb: f64,
    pub net_recv_mb: f64,
    /// Fields that could not be read for this tick (reported as 0)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
}

/// Descriptive data about a run, fixed at start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub environment: String,
    #[serde(rename = "timestamp")]
    pub started_at: DateTime<Utc>,
    pub configured_duration_seconds: f64,
    pub interval_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
}

impl RunMetadata {
    pub fn new(
        environment: impl Into<String>,
        configured_duration_seconds: f64,
        interval_seconds: f64,
    ) -> Self {
        Self {
            environment: environment.into(),
            started_at: Utc::now(),
            configured_duration_seconds,
            interval_seconds,
            hostname: None,
            kernel: None,
        }
    }

    /// Fill hostname and kernel release from the host, when known
    pub fn with_host_info(mut self) -> Self {
        self.hostname = sysinfo::System::host_name();
        self.kernel = sysinfo::System::kernel_version();
        self
    }
}

/// Reduced statistics over all samples of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub avg_cpu_percent: f64,
    pub max_cpu_percent: f64,
    pub avg_memory_percent: f64,
    pub max_memory_percent: f64,
    pub total_disk_read_mb: f64,
    pub total_disk_write_mb: f64,
    pub total_net_sent_mb: f64,
    pub total_net_recv_mb: f64,
    pub sample_count: usize,
    pub estimated_power_watts: f64,
    pub estimated_energy_joules: f64,
    pub estimated_energy_wh: f64,
    pub assumed_tdp_watts: f64,
    pub estimation_method: String,
}

/// Everything one run produces: the unit that is serialized and compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub metadata: RunMetadata,
    /// Wall-clock span actually elapsed
    pub duration_seconds: f64,
    #[serde(default)]
    pub interrupted: bool,
    pub samples: Vec<Sample>,
    pub summary: Summary,
}

impl RunReport {
    pub fn environment(&self) -> &str {
        &self.metadata.environment
    }
}
