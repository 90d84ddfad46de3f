//! Prometheus text exposition of run summaries
//!
//! Uses a private registry so run figures never mix with the process's own
//! self-metrics in [`crate::observability`].

use crate::error::Result;
use crate::models::RunReport;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

const ENVIRONMENT_LABEL: &str = "environment";

struct SummaryGauges {
    cpu_usage: GaugeVec,
    max_cpu_usage: GaugeVec,
    memory_usage: GaugeVec,
    power_watts: GaugeVec,
    energy_wh: GaugeVec,
    duration_seconds: GaugeVec,
    samples: GaugeVec,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), &[ENVIRONMENT_LABEL])?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl SummaryGauges {
    fn register(registry: &Registry) -> Result<Self> {
        Ok(Self {
            cpu_usage: gauge(
                registry,
                "bench_cpu_usage_percent",
                "Average CPU utilisation over the run",
            )?,
            max_cpu_usage: gauge(
                registry,
                "bench_max_cpu_usage_percent",
                "Peak CPU utilisation over the run",
            )?,
            memory_usage: gauge(
                registry,
                "bench_memory_usage_percent",
                "Average memory utilisation over the run",
            )?,
            power_watts: gauge(
                registry,
                "bench_estimated_power_watts",
                "Estimated average power draw (TDP scaled by CPU)",
            )?,
            energy_wh: gauge(
                registry,
                "bench_estimated_energy_wh",
                "Estimated energy consumed over the run",
            )?,
            duration_seconds: gauge(
                registry,
                "bench_run_duration_seconds",
                "Wall-clock duration of the run",
            )?,
            samples: gauge(
                registry,
                "bench_samples_total",
                "Number of samples collected during the run",
            )?,
        })
    }

    fn record(&self, report: &RunReport) {
        let labels = [report.environment()];
        let s = &report.summary;

        self.cpu_usage.with_label_values(&labels).set(s.avg_cpu_percent);
        self.max_cpu_usage
            .with_label_values(&labels)
            .set(s.max_cpu_percent);
        self.memory_usage
            .with_label_values(&labels)
            .set(s.avg_memory_percent);
        self.power_watts
            .with_label_values(&labels)
            .set(s.estimated_power_watts);
        self.energy_wh
            .with_label_values(&labels)
            .set(s.estimated_energy_wh);
        self.duration_seconds
            .with_label_values(&labels)
            .set(report.duration_seconds);
        self.samples
            .with_label_values(&labels)
            .set(s.sample_count as f64);
    }
}

/// Render one labelled series per environment in Prometheus text format
///
/// When several reports share an environment the last one in `reports` wins.
pub fn render_exposition(reports: &[RunReport]) -> Result<String> {
    let registry = Registry::new();
    let gauges = SummaryGauges::register(&registry)?;

    for report in reports {
        gauges.record(report);
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunMetadata, Summary};

    fn report(environment: &str, avg_cpu: f64, duration: f64) -> RunReport {
        RunReport {
            metadata: RunMetadata::new(environment, duration, 1.0),
            duration_seconds: duration,
            interrupted: false,
            samples: Vec::new(),
            summary: Summary {
                avg_cpu_percent: avg_cpu,
                max_cpu_percent: avg_cpu * 2.0,
                sample_count: 10,
                estimated_power_watts: 6.5,
                estimated_energy_wh: 0.0181,
                ..Summary::default()
            },
        }
    }

    #[test]
    fn test_one_series_per_environment() {
        let text = render_exposition(&[
            report("docker", 25.0, 10.0),
            report("unikernel", 12.5, 8.0),
        ])
        .unwrap();

        assert!(text.contains("# TYPE bench_cpu_usage_percent gauge"));
        assert!(text.contains("bench_cpu_usage_percent{environment=\"docker\"} 25"));
        assert!(text.contains("bench_cpu_usage_percent{environment=\"unikernel\"} 12.5"));
        assert!(text.contains("bench_run_duration_seconds{environment=\"unikernel\"} 8"));
        assert!(text.contains("bench_samples_total{environment=\"docker\"} 10"));
        assert_eq!(
            text.matches("bench_max_cpu_usage_percent{").count(),
            2,
            "expected one series per environment"
        );
    }

    #[test]
    fn test_exposition_does_not_leak_self_metrics() {
        crate::observability::SamplerMetrics::new().inc_samples_collected();
        let text = render_exposition(&[report("docker", 1.0, 1.0)]).unwrap();
        assert!(!text.contains("resource_bench_"));
    }

    #[test]
    fn test_empty_reports_render_nothing() {
        let text = render_exposition(&[]).unwrap();
        assert!(!text.contains("environment="));
    }
}
