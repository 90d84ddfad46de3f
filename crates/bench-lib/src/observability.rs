//! Observability infrastructure for the sampler
//!
//! Provides:
//! - Prometheus self-metrics (snapshot latency, samples, counter errors and resets)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for snapshot latency (in seconds); the CPU window dominates
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.01, 0.05, 0.1, 0.15, 0.25, 0.5, 1.0, 2.5];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SamplerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct SamplerMetricsInner {
    snapshot_latency_seconds: Histogram,
    samples_collected: IntCounter,
    counter_read_errors: IntCounterVec,
    counter_resets: IntCounterVec,
    runs_interrupted: IntCounter,
}

impl SamplerMetricsInner {
    fn new() -> Self {
        Self {
            snapshot_latency_seconds: register_histogram!(
                "resource_bench_snapshot_latency_seconds",
                "Time spent reading one counter snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register snapshot_latency_seconds"),

            samples_collected: register_int_counter!(
                "resource_bench_samples_collected_total",
                "Total number of samples collected"
            )
            .expect("Failed to register samples_collected"),

            counter_read_errors: register_int_counter_vec!(
                "resource_bench_counter_read_errors_total",
                "Counter reads that fell back to zero",
                &["field"]
            )
            .expect("Failed to register counter_read_errors"),

            counter_resets: register_int_counter_vec!(
                "resource_bench_counter_resets_total",
                "Cumulative counters that went backwards during a run",
                &["field"]
            )
            .expect("Failed to register counter_resets"),

            runs_interrupted: register_int_counter!(
                "resource_bench_runs_interrupted_total",
                "Runs stopped early by a shutdown signal"
            )
            .expect("Failed to register runs_interrupted"),
        }
    }
}

/// Sampler self-metrics
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SamplerMetrics {
    _private: (),
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SamplerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SamplerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_snapshot_latency(&self, duration_secs: f64) {
        self.inner().snapshot_latency_seconds.observe(duration_secs);
    }

    pub fn inc_samples_collected(&self) {
        self.inner().samples_collected.inc();
    }

    pub fn inc_counter_read_errors(&self, field: &str) {
        self.inner()
            .counter_read_errors
            .with_label_values(&[field])
            .inc();
    }

    pub fn inc_counter_resets(&self, field: &str) {
        self.inner().counter_resets.with_label_values(&[field]).inc();
    }

    pub fn inc_runs_interrupted(&self) {
        self.inner().runs_interrupted.inc();
    }

    pub fn samples_collected(&self) -> u64 {
        self.inner().samples_collected.get()
    }

    /// Encode the global registry in the Prometheus text format
    pub fn gather_text(&self) -> crate::error::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for run events
///
/// Provides consistent JSON-formatted logging for run lifecycle and
/// counter degradation.
#[derive(Clone)]
pub struct StructuredLogger {
    environment: String,
}

impl StructuredLogger {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    /// Log the start of a run
    pub fn log_run_started(&self, source: &str, duration_secs: f64, interval_secs: f64) {
        info!(
            event = "run_started",
            environment = %self.environment,
            source = %source,
            duration_secs = duration_secs,
            interval_secs = interval_secs,
            "Sampling run started"
        );
    }

    /// Log the end of a run
    pub fn log_run_finished(
        &self,
        sample_count: usize,
        elapsed_secs: f64,
        avg_cpu_percent: f64,
        estimated_energy_wh: f64,
        interrupted: bool,
    ) {
        info!(
            event = "run_finished",
            environment = %self.environment,
            sample_count = sample_count,
            elapsed_secs = elapsed_secs,
            avg_cpu_percent = avg_cpu_percent,
            estimated_energy_wh = estimated_energy_wh,
            interrupted = interrupted,
            "Sampling run finished"
        );
    }

    /// Log an interruption
    pub fn log_interrupted(&self, samples_so_far: usize) {
        warn!(
            event = "run_interrupted",
            environment = %self.environment,
            samples = samples_so_far,
            "Shutdown requested, summarizing collected samples"
        );
    }

    /// Log a counter that had to fall back to zero
    pub fn log_counter_unavailable(&self, field: &str, reason: &str) {
        warn!(
            event = "counter_unavailable",
            environment = %self.environment,
            field = %field,
            reason = %reason,
            "Counter unavailable, reporting zero"
        );
    }

    /// Log a cumulative counter that went backwards
    pub fn log_counter_reset(&self, field: &str) {
        warn!(
            event = "counter_reset",
            environment = %self.environment,
            field = %field,
            "Counter went backwards, re-basing delta"
        );
    }

    /// Log an artifact written to disk
    pub fn log_artifact_written(&self, kind: &str, path: &std::path::Path) {
        info!(
            event = "artifact_written",
            environment = %self.environment,
            kind = %kind,
            path = %path.display(),
            "Artifact written"
        );
    }
}
