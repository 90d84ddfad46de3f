//! CPU-bound hash-chain workload
//!
//! Gives the sampler something deterministic to measure when no external
//! service is under test. Each iteration runs a chain of SHA-256 and SHA-512
//! digests; CPU and memory are read through a [`CounterSource`] every few
//! iterations.

use crate::counters::CounterSource;
use crate::error::{BenchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Iterations between two counter reads
const SAMPLE_EVERY: u64 = 10;

/// Pause between iterations
const ITERATION_PAUSE: Duration = Duration::from_millis(50);

/// How much hashing one iteration performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Light,
    #[default]
    Medium,
    Heavy,
}

impl Intensity {
    /// Hash operations per iteration
    pub fn operations(&self) -> u32 {
        match self {
            Intensity::Light => 5_000,
            Intensity::Medium => 15_000,
            Intensity::Heavy => 50_000,
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intensity::Light => "light",
            Intensity::Medium => "medium",
            Intensity::Heavy => "heavy",
        };
        f.write_str(name)
    }
}

impl FromStr for Intensity {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Intensity::Light),
            "medium" => Ok(Intensity::Medium),
            "heavy" => Ok(Intensity::Heavy),
            other => Err(BenchError::invalid_config(
                "intensity",
                format!("unknown intensity '{}', expected light, medium or heavy", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStats {
    pub cpu_avg: f64,
    pub cpu_max: f64,
    pub cpu_min: f64,
    pub memory_avg_mb: f64,
    pub memory_max_mb: f64,
}

impl WorkloadStats {
    fn from_samples(cpu: &[f64], memory_mb: &[f64]) -> Self {
        let mut stats = Self::default();

        if !cpu.is_empty() {
            stats.cpu_avg = cpu.iter().sum::<f64>() / cpu.len() as f64;
            stats.cpu_max = cpu.iter().copied().fold(f64::MIN, f64::max);
            stats.cpu_min = cpu.iter().copied().fold(f64::MAX, f64::min);
        }
        if !memory_mb.is_empty() {
            stats.memory_avg_mb = memory_mb.iter().sum::<f64>() / memory_mb.len() as f64;
            stats.memory_max_mb = memory_mb.iter().copied().fold(f64::MIN, f64::max);
        }

        stats
    }
}

/// Outcome of one workload run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub intensity: Intensity,
    /// Logical CPUs available to the process
    pub cpu_count: usize,
    pub iterations: u64,
    pub iterations_per_sec: f64,
    pub cpu_samples: Vec<f64>,
    pub memory_samples: Vec<f64>,
    pub stats: WorkloadStats,
}

#[derive(Debug, Clone)]
pub struct WorkloadBenchmark {
    duration: Duration,
    intensity: Intensity,
}

impl WorkloadBenchmark {
    pub fn new(duration: Duration, intensity: Intensity) -> Result<Self> {
        if duration.is_zero() {
            return Err(BenchError::invalid_config("duration", "must be positive"));
        }
        Ok(Self {
            duration,
            intensity,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    /// Hash until the duration has elapsed, reading counters along the way
    ///
    /// Unavailable counter readings are left out of the samples rather than
    /// recorded as zero.
    pub async fn run(&self, source: &mut dyn CounterSource) -> WorkloadResult {
        let cpu_count = cpu_count();
        info!(
            duration_secs = self.duration.as_secs_f64(),
            intensity = %self.intensity,
            cpu_count,
            source = source.name(),
            "Starting workload"
        );

        let start_time = Utc::now();
        let started = Instant::now();
        let mut iterations: u64 = 0;
        let mut cpu_samples = Vec::new();
        let mut memory_samples = Vec::new();

        while started.elapsed() < self.duration {
            let digest = hash_chain(iterations, self.intensity.operations());
            std::hint::black_box(digest);

            iterations += 1;

            if iterations % SAMPLE_EVERY == 0 {
                let snapshot = source.read_snapshot().await;
                if let Some(cpu) = snapshot.cpu_percent.value() {
                    cpu_samples.push(cpu);
                }
                if let Some(used) = snapshot.memory_used_mb.value() {
                    memory_samples.push(used);
                }
                debug!(iteration = iterations, "Workload sample taken");
            }

            tokio::time::sleep(ITERATION_PAUSE).await;
        }

        let elapsed = started.elapsed().as_secs_f64();
        let stats = WorkloadStats::from_samples(&cpu_samples, &memory_samples);

        info!(
            iterations,
            elapsed_secs = elapsed,
            cpu_avg = stats.cpu_avg,
            "Workload finished"
        );

        WorkloadResult {
            start_time,
            end_time: Utc::now(),
            duration_seconds: elapsed,
            intensity: self.intensity,
            cpu_count,
            iterations,
            iterations_per_sec: if elapsed > 0.0 {
                iterations as f64 / elapsed
            } else {
                0.0
            },
            cpu_samples,
            memory_samples,
            stats,
        }
    }
}

/// Logical CPUs the workload can run on, at least 1
pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Run `operations` rounds of SHA-256 followed by SHA-512 over the hex digest
pub fn hash_chain(seed: u64, operations: u32) -> String {
    let mut data = format!("iteration-{}", seed);
    for _ in 0..operations {
        let first = hex::encode(Sha256::digest(data.as_bytes()));
        data = hex::encode(Sha512::digest(first.as_bytes()));
    }
    data
}
