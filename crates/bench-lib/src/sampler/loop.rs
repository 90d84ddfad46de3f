//! Sampling loop
//!
//! Runs on a fixed wall-clock cadence for a fixed total duration, producing
//! one sample per tick. The cadence is aligned to the start of the run so
//! that slow snapshots do not accumulate drift.

use super::delta::{DeltaTracker, Deltas};
use crate::counters::{CounterSource, Snapshot};
use crate::error::{BenchError, Result};
use crate::models::{Reading, RunMetadata, RunReport, Sample};
use crate::observability::{SamplerMetrics, StructuredLogger};
use crate::summary::{summarize, EnergyModel};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::time::Instant;
use tracing::debug;

/// Configuration for one sampling run
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Free-text environment label ("docker", "microvm", "unikernel", ...)
    pub environment: String,
    /// Target run length (default: 10 seconds)
    pub duration: Duration,
    /// Sampling cadence (default: 1 second)
    pub interval: Duration,
    /// Record hostname and kernel release in the report
    pub host_info: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            environment: "unknown".to_string(),
            duration: Duration::from_secs(10),
            interval: Duration::from_secs(1),
            host_info: true,
        }
    }
}

impl SamplerConfig {
    /// Check the configuration before any sampling starts
    pub fn validate(&self) -> Result<()> {
        if self.duration.is_zero() {
            return Err(BenchError::invalid_config("duration", "must be positive"));
        }
        if self.interval.is_zero() {
            return Err(BenchError::invalid_config("interval", "must be positive"));
        }
        if self.environment.trim().is_empty() {
            return Err(BenchError::invalid_config("environment", "must not be empty"));
        }
        Ok(())
    }
}

/// Lifecycle of a sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Init,
    Running,
    Done,
}

/// Receives the shutdown signal; a closed channel means "never cancelled"
struct ShutdownListener {
    rx: Option<broadcast::Receiver<()>>,
}

impl ShutdownListener {
    fn new(rx: broadcast::Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Non-blocking check, used at the top of every iteration
    fn is_requested(&mut self) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            return false;
        };
        match rx.try_recv() {
            Ok(()) | Err(TryRecvError::Lagged(_)) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                self.rx = None;
                false
            }
        }
    }

    /// Resolves when shutdown is requested
    async fn requested(&mut self) {
        loop {
            match self.rx.as_mut() {
                Some(rx) => match rx.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => return,
                    Err(RecvError::Closed) => self.rx = None,
                },
                None => std::future::pending::<()>().await,
            }
        }
    }
}

/// Time left until the next tick boundary, measured from the run start
pub fn next_tick_delay(elapsed: Duration, interval: Duration) -> Duration {
    let interval_nanos = interval.as_nanos();
    if interval_nanos == 0 {
        return Duration::ZERO;
    }
    let into_tick = (elapsed.as_nanos() % interval_nanos) as u64;
    interval - Duration::from_nanos(into_tick)
}

/// Metrics sampling loop for one run
pub struct Sampler {
    source: Box<dyn CounterSource>,
    config: SamplerConfig,
    energy: EnergyModel,
    state: SamplerState,
    logger: StructuredLogger,
    metrics: SamplerMetrics,
}

impl Sampler {
    /// Create a sampler; fails with a configuration error before any sampling
    pub fn new(
        source: Box<dyn CounterSource>,
        config: SamplerConfig,
        energy: EnergyModel,
    ) -> Result<Self> {
        config.validate()?;

        // Every snapshot waits out the source's CPU window; a window as long
        // as the interval would skip tick boundaries
        let cpu_window = source.cpu_window();
        if cpu_window >= config.interval {
            return Err(BenchError::invalid_config(
                "cpu_window",
                format!(
                    "{} source window {:?} must be shorter than the sampling interval {:?}",
                    source.name(),
                    cpu_window,
                    config.interval
                ),
            ));
        }

        if !(energy.tdp_watts.is_finite() && energy.tdp_watts >= 0.0) {
            return Err(BenchError::invalid_config(
                "tdp_watts",
                format!("{} is not a valid wattage", energy.tdp_watts),
            ));
        }

        let logger = StructuredLogger::new(&config.environment);
        Ok(Self {
            source,
            config,
            energy,
            state: SamplerState::Init,
            logger,
            metrics: SamplerMetrics::new(),
        })
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run until the configured duration elapses or shutdown is requested
    ///
    /// Shutdown is observed between ticks only; an interrupted run still
    /// produces a complete report over the samples collected so far.
    pub async fn run(&mut self, shutdown: broadcast::Receiver<()>) -> Result<RunReport> {
        if self.state != SamplerState::Init {
            return Err(BenchError::AlreadyRun);
        }

        let mut shutdown = ShutdownListener::new(shutdown);
        let mut metadata = RunMetadata::new(
            self.config.environment.clone(),
            self.config.duration.as_secs_f64(),
            self.config.interval.as_secs_f64(),
        );
        if self.config.host_info {
            metadata = metadata.with_host_info();
        }

        self.logger.log_run_started(
            self.source.name(),
            metadata.configured_duration_seconds,
            metadata.interval_seconds,
        );

        let baseline = self.source.read_snapshot().await;
        let mut tracker = DeltaTracker::from_baseline(&baseline);
        let mut warned = HashSet::new();
        let mut samples = Vec::new();
        let mut interrupted = false;

        self.state = SamplerState::Running;
        let start = Instant::now();

        loop {
            if shutdown.is_requested() {
                interrupted = true;
                break;
            }
            if start.elapsed() >= self.config.duration {
                break;
            }

            let tick_start = Instant::now();
            let snapshot = self.source.read_snapshot().await;
            self.metrics
                .observe_snapshot_latency(tick_start.elapsed().as_secs_f64());

            let deltas = tracker.delta(&snapshot);
            let sample = self.assemble_sample(&snapshot, &deltas, &mut warned);
            debug!(
                tick = samples.len(),
                cpu_percent = sample.cpu_percent,
                memory_percent = sample.memory_percent,
                "Sample collected"
            );
            samples.push(sample);
            self.metrics.inc_samples_collected();

            let deadline = Instant::now() + next_tick_delay(start.elapsed(), self.config.interval);
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = shutdown.requested() => {
                    interrupted = true;
                    break;
                }
            }
        }

        self.state = SamplerState::Done;
        let duration_seconds = start.elapsed().as_secs_f64();

        if interrupted {
            self.metrics.inc_runs_interrupted();
            self.logger.log_interrupted(samples.len());
        }

        let summary = summarize(&samples, duration_seconds, &self.energy);
        self.logger.log_run_finished(
            summary.sample_count,
            duration_seconds,
            summary.avg_cpu_percent,
            summary.estimated_energy_wh,
            interrupted,
        );

        Ok(RunReport {
            metadata,
            duration_seconds,
            interrupted,
            samples,
            summary,
        })
    }

    /// Build a sample, substituting zero for unavailable fields
    fn assemble_sample(
        &self,
        snapshot: &Snapshot,
        deltas: &Deltas,
        warned: &mut HashSet<&'static str>,
    ) -> Sample {
        for field in &deltas.resets {
            self.metrics.inc_counter_resets(field);
            self.logger.log_counter_reset(field);
        }

        let fields: [(&'static str, &Reading<f64>); 8] = [
            ("cpu_percent", &snapshot.cpu_percent),
            ("memory_percent", &snapshot.memory_percent),
            ("memory_used_mb", &snapshot.memory_used_mb),
            ("memory_available_mb", &snapshot.memory_available_mb),
            ("disk_read_mb", &deltas.disk_read_mb),
            ("disk_write_mb", &deltas.disk_write_mb),
            ("net_sent_mb", &deltas.net_sent_mb),
            ("net_recv_mb", &deltas.net_recv_mb),
        ];

        let mut unavailable = Vec::new();
        for (name, reading) in fields {
            if let Some(reason) = reading.reason() {
                self.metrics.inc_counter_read_errors(name);
                if warned.insert(name) {
                    self.logger.log_counter_unavailable(name, reason);
                }
                unavailable.push(name.to_string());
            }
        }

        Sample {
            timestamp: chrono::Utc::now(),
            cpu_percent: snapshot.cpu_percent.value_or_zero(),
            memory_percent: snapshot.memory_percent.value_or_zero(),
            memory_used_mb: snapshot.memory_used_mb.value_or_zero(),
            memory_available_mb: snapshot.memory_available_mb.value_or_zero(),
            disk_read_mb: deltas.disk_read_mb.value_or_zero(),
            disk_write_mb: deltas.disk_write_mb.value_or_zero(),
            net_sent_mb: deltas.net_sent_mb.value_or_zero(),
            net_recv_mb: deltas.net_recv_mb.value_or_zero(),
            unavailable,
        }
    }
}

/// Builder for creating a sampler
pub struct SamplerBuilder {
    source: Option<Box<dyn CounterSource>>,
    config: SamplerConfig,
    energy: EnergyModel,
}

impl SamplerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            source: None,
            config: SamplerConfig::default(),
            energy: EnergyModel::default(),
        }
    }

    /// Set the counter source
    pub fn source(mut self, source: Box<dyn CounterSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the environment label
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    /// Set the run duration
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    /// Set the sampling interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Record hostname and kernel release
    pub fn host_info(mut self, enabled: bool) -> Self {
        self.config.host_info = enabled;
        self
    }

    /// Set the energy model
    pub fn energy(mut self, energy: EnergyModel) -> Self {
        self.energy = energy;
        self
    }

    /// Build the sampler
    pub fn build(self) -> Result<Sampler> {
        let source = self
            .source
            .ok_or_else(|| BenchError::invalid_config("source", "a counter source is required"))?;

        Sampler::new(source, self.config, self.energy)
    }
}

impl Default for SamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Scripted source: constant CPU, disk read counter growing 1 MB per read
    struct ScriptedSource {
        reads: usize,
        cpu_percent: f64,
        window: Duration,
        missing_network: bool,
        cancel_at_read: Option<(usize, broadcast::Sender<()>)>,
    }

    impl ScriptedSource {
        fn new(cpu_percent: f64) -> Self {
            Self {
                reads: 0,
                cpu_percent,
                window: Duration::ZERO,
                missing_network: false,
                cancel_at_read: None,
            }
        }
    }

    #[async_trait]
    impl CounterSource for ScriptedSource {
        async fn read_snapshot(&mut self) -> Snapshot {
            if !self.window.is_zero() {
                tokio::time::sleep(self.window).await;
            }
            let bytes = self.reads as u64 * 1_000_000;
            self.reads += 1;

            if let Some((at, tx)) = &self.cancel_at_read {
                if self.reads == *at {
                    let _ = tx.send(());
                }
            }

            let net = if self.missing_network {
                Reading::Unavailable("net/dev hidden".to_string())
            } else {
                Reading::Present(0)
            };

            Snapshot {
                cpu_percent: Reading::Present(self.cpu_percent),
                memory_percent: Reading::Present(40.0),
                memory_used_mb: Reading::Present(400.0),
                memory_available_mb: Reading::Present(600.0),
                disk_read_bytes: Reading::Present(bytes),
                disk_write_bytes: Reading::Present(0),
                net_sent_bytes: net.clone(),
                net_recv_bytes: net,
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn cpu_window(&self) -> Duration {
            self.window
        }
    }

    fn sampler(source: ScriptedSource, duration: Duration, interval: Duration) -> Sampler {
        SamplerBuilder::new()
            .source(Box::new(source))
            .environment("test")
            .duration(duration)
            .interval(interval)
            .host_info(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sampler_config_default() {
        let config = SamplerConfig::default();
        assert_eq!(config.duration, Duration::from_secs(10));
        assert_eq!(config.interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let result = SamplerBuilder::new()
            .source(Box::new(ScriptedSource::new(0.0)))
            .duration(Duration::ZERO)
            .build();

        assert!(matches!(
            result,
            Err(BenchError::InvalidConfig { field: "duration", .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SamplerConfig {
            interval: Duration::ZERO,
            ..SamplerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BenchError::InvalidConfig { field: "interval", .. })
        ));
    }

    #[test]
    fn test_source_window_must_fit_interval() {
        let mut source = ScriptedSource::new(0.0);
        source.window = Duration::from_millis(100);

        let result = SamplerBuilder::new()
            .source(Box::new(source))
            .interval(Duration::from_millis(100))
            .build();

        assert!(matches!(
            result,
            Err(BenchError::InvalidConfig { field: "cpu_window", .. })
        ));
    }

    #[test]
    fn test_sysinfo_minimum_window_is_checked() {
        // sysinfo raises a short window to its minimum refresh interval
        let source = crate::counters::SysinfoSource::new(Duration::from_millis(1));
        let window = source.cpu_window();
        assert!(window >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        let result = SamplerBuilder::new()
            .source(Box::new(source))
            .interval(window)
            .duration(Duration::from_secs(3))
            .host_info(false)
            .build();

        assert!(matches!(
            result,
            Err(BenchError::InvalidConfig { field: "cpu_window", .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_count_with_cpu_window() {
        let (_tx, rx) = broadcast::channel(1);
        let mut source = ScriptedSource::new(30.0);
        source.window = Duration::from_millis(40);

        let duration = Duration::from_secs(2);
        let interval = Duration::from_millis(60);
        let mut sampler = sampler(source, duration, interval);
        let report = sampler.run(rx).await.unwrap();

        let expected_min = (duration.as_millis() / interval.as_millis()) as usize;
        let count = report.samples.len();
        assert!(
            (expected_min..=expected_min + 2).contains(&count),
            "expected at least {} samples, got {}",
            expected_min,
            count
        );
    }

    #[test]
    fn test_builder_missing_source() {
        let result = SamplerBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_next_tick_delay() {
        let interval = Duration::from_secs(1);
        assert_eq!(next_tick_delay(Duration::ZERO, interval), interval);
        assert_eq!(
            next_tick_delay(Duration::from_millis(1250), interval),
            Duration::from_millis(750)
        );
        assert_eq!(
            next_tick_delay(Duration::from_millis(3000), interval),
            interval
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_count_for_full_run() {
        let (_tx, rx) = broadcast::channel(1);
        let mut sampler = sampler(
            ScriptedSource::new(50.0),
            Duration::from_secs(10),
            Duration::from_secs(1),
        );

        let report = sampler.run(rx).await.unwrap();

        let count = report.samples.len();
        assert!((10..=11).contains(&count), "unexpected sample count {}", count);
        assert_eq!(report.summary.sample_count, count);
        assert_eq!(report.summary.avg_cpu_percent, 50.0);
        assert_eq!(report.summary.max_cpu_percent, 50.0);
        assert!(!report.interrupted);
        assert!(report.duration_seconds >= 10.0);
        assert_eq!(sampler.state(), SamplerState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_count_uneven_interval() {
        let (_tx, rx) = broadcast::channel(1);
        let mut sampler = sampler(
            ScriptedSource::new(10.0),
            Duration::from_millis(2500),
            Duration::from_secs(1),
        );

        let report = sampler.run(rx).await.unwrap();

        // floor(2.5) ..= ceil(2.5) + 1
        let count = report.samples.len();
        assert!((2..=4).contains(&count), "unexpected sample count {}", count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deltas_accumulate_across_samples() {
        let (_tx, rx) = broadcast::channel(1);
        let mut sampler = sampler(
            ScriptedSource::new(10.0),
            Duration::from_secs(3),
            Duration::from_secs(1),
        );

        let report = sampler.run(rx).await.unwrap();

        // Baseline read is 0 bytes, each tick adds 1 MB
        assert_eq!(report.samples[0].disk_read_mb, 1.0);
        assert_eq!(report.samples[1].disk_read_mb, 2.0);
        let last = report.samples.last().unwrap();
        assert_eq!(report.summary.total_disk_read_mb, last.disk_read_mb);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_collected_samples() {
        let (tx, rx) = broadcast::channel(1);
        let mut source = ScriptedSource::new(25.0);
        // Baseline plus three ticks
        source.cancel_at_read = Some((4, tx.clone()));

        let mut sampler = sampler(source, Duration::from_secs(10), Duration::from_secs(1));
        let report = sampler.run(rx).await.unwrap();

        assert!(report.interrupted);
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.summary.sample_count, 3);
        assert_eq!(report.summary.avg_cpu_percent, 25.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_before_first_tick() {
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let mut sampler = sampler(
            ScriptedSource::new(25.0),
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        let report = sampler.run(rx).await.unwrap();

        assert!(report.interrupted);
        assert!(report.samples.is_empty());
        assert_eq!(report.summary.sample_count, 0);
        assert_eq!(report.summary.estimated_power_watts, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_shutdown_channel_does_not_cancel() {
        let (tx, rx) = broadcast::channel::<()>(1);
        drop(tx);

        let mut sampler = sampler(
            ScriptedSource::new(5.0),
            Duration::from_secs(3),
            Duration::from_secs(1),
        );
        let report = sampler.run(rx).await.unwrap();

        assert!(!report.interrupted);
        assert!(report.samples.len() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_fields_marked_per_sample() {
        let (_tx, rx) = broadcast::channel(1);
        let mut source = ScriptedSource::new(5.0);
        source.missing_network = true;

        let mut sampler = sampler(source, Duration::from_secs(2), Duration::from_secs(1));
        let report = sampler.run(rx).await.unwrap();

        for sample in &report.samples {
            assert_eq!(sample.net_sent_mb, 0.0);
            assert_eq!(
                sample.unavailable,
                vec!["net_sent_mb".to_string(), "net_recv_mb".to_string()]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_runs_once() {
        let (_tx, rx) = broadcast::channel(1);
        let mut sampler = sampler(
            ScriptedSource::new(5.0),
            Duration::from_secs(1),
            Duration::from_millis(500),
        );

        assert_eq!(sampler.state(), SamplerState::Init);
        sampler.run(rx).await.unwrap();

        let (_tx, rx) = broadcast::channel(1);
        assert!(matches!(sampler.run(rx).await, Err(BenchError::AlreadyRun)));
    }
}
