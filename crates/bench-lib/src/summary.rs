//! Summary statistics over the samples of a run
//!
//! The power and energy figures are a heuristic: an assumed thermal design
//! power scaled by the mean CPU utilisation. They are not a calibrated
//! hardware reading and every artifact carries the assumed TDP and the
//! estimation method next to them.

use crate::models::{Sample, Summary};
use serde::{Deserialize, Serialize};

/// Default assumed thermal design power of the host CPU
pub const DEFAULT_TDP_WATTS: f64 = 65.0;

/// Name recorded in every summary for the power heuristic
pub const ESTIMATION_METHOD: &str = "tdp_scaled_cpu";

/// Parameters of the power estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyModel {
    pub tdp_watts: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            tdp_watts: DEFAULT_TDP_WATTS,
        }
    }
}

impl EnergyModel {
    pub fn new(tdp_watts: f64) -> Self {
        Self { tdp_watts }
    }

    /// Estimated draw in watts for a mean CPU utilisation
    pub fn power_watts(&self, avg_cpu_percent: f64) -> f64 {
        self.tdp_watts * (avg_cpu_percent / 100.0)
    }
}

/// Reduce a run's samples into its summary
///
/// An empty run yields `sample_count == 0` and every numeric field at zero.
pub fn summarize(samples: &[Sample], duration_seconds: f64, model: &EnergyModel) -> Summary {
    let Some(last) = samples.last() else {
        return Summary {
            estimation_method: ESTIMATION_METHOD.to_string(),
            ..Summary::default()
        };
    };

    let mut cpu_total = 0.0;
    let mut memory_total = 0.0;
    let mut max_cpu = f64::MIN;
    let mut max_memory = f64::MIN;

    for sample in samples {
        cpu_total += sample.cpu_percent;
        memory_total += sample.memory_percent;
        max_cpu = max_cpu.max(sample.cpu_percent);
        max_memory = max_memory.max(sample.memory_percent);
    }

    let count = samples.len();
    let avg_cpu_percent = cpu_total / count as f64;
    let avg_memory_percent = memory_total / count as f64;

    let power_watts = model.power_watts(avg_cpu_percent);
    let energy_joules = power_watts * duration_seconds.max(0.0);

    Summary {
        avg_cpu_percent,
        max_cpu_percent: max_cpu,
        avg_memory_percent,
        max_memory_percent: max_memory,
        total_disk_read_mb: last.disk_read_mb,
        total_disk_write_mb: last.disk_write_mb,
        total_net_sent_mb: last.net_sent_mb,
        total_net_recv_mb: last.net_recv_mb,
        sample_count: count,
        estimated_power_watts: round_to(power_watts, 2),
        estimated_energy_joules: round_to(energy_joules, 2),
        estimated_energy_wh: round_to(energy_joules / 3600.0, 4),
        assumed_tdp_watts: model.tdp_watts,
        estimation_method: ESTIMATION_METHOD.to_string(),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(cpu: f64, memory: f64, disk_read_mb: f64) -> Sample {
        Sample {
            timestamp: Utc::now(),
            cpu_percent: cpu,
            memory_percent: memory,
            memory_used_mb: 1000.0,
            memory_available_mb: 3000.0,
            disk_read_mb,
            disk_write_mb: disk_read_mb / 2.0,
            net_sent_mb: 0.25,
            net_recv_mb: 0.5,
            unavailable: Vec::new(),
        }
    }

    #[test]
    fn test_empty_run() {
        let summary = summarize(&[], 10.0, &EnergyModel::default());

        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.avg_cpu_percent, 0.0);
        assert_eq!(summary.max_cpu_percent, 0.0);
        assert_eq!(summary.avg_memory_percent, 0.0);
        assert_eq!(summary.total_disk_read_mb, 0.0);
        assert_eq!(summary.estimated_power_watts, 0.0);
        assert_eq!(summary.estimated_energy_joules, 0.0);
        assert_eq!(summary.estimated_energy_wh, 0.0);
        assert_eq!(summary.estimation_method, ESTIMATION_METHOD);
    }

    #[test]
    fn test_constant_cpu() {
        let samples: Vec<Sample> = (0..5).map(|_| sample(50.0, 30.0, 1.0)).collect();
        let summary = summarize(&samples, 5.0, &EnergyModel::default());

        assert_eq!(summary.avg_cpu_percent, 50.0);
        assert_eq!(summary.max_cpu_percent, 50.0);
        assert_eq!(summary.avg_memory_percent, 30.0);
        assert_eq!(summary.sample_count, 5);
    }

    #[test]
    fn test_mean_max_and_totals() {
        let samples = vec![
            sample(10.0, 20.0, 0.0),
            sample(30.0, 40.0, 1.5),
            sample(20.0, 60.0, 3.0),
        ];
        let summary = summarize(&samples, 3.0, &EnergyModel::default());

        assert!((summary.avg_cpu_percent - 20.0).abs() < 1e-9);
        assert_eq!(summary.max_cpu_percent, 30.0);
        assert!((summary.avg_memory_percent - 40.0).abs() < 1e-9);
        assert_eq!(summary.max_memory_percent, 60.0);
        // Totals come from the last sample
        assert_eq!(summary.total_disk_read_mb, 3.0);
        assert_eq!(summary.total_disk_write_mb, 1.5);
        assert_eq!(summary.total_net_recv_mb, 0.5);
    }

    #[test]
    fn test_energy_estimate() {
        let tdp = 80.0;
        let samples: Vec<Sample> = (0..10).map(|_| sample(50.0, 10.0, 0.0)).collect();
        let summary = summarize(&samples, 10.0, &EnergyModel::new(tdp));

        assert_eq!(summary.estimated_power_watts, tdp * 0.5);
        assert_eq!(summary.estimated_energy_joules, tdp * 0.5 * 10.0);
        assert!((summary.estimated_energy_wh - (tdp * 0.5 * 10.0) / 3600.0).abs() < 1e-4);
        assert_eq!(summary.assumed_tdp_watts, tdp);
    }

    #[test]
    fn test_energy_rounding() {
        let samples = vec![sample(33.333, 0.0, 0.0)];
        let summary = summarize(&samples, 7.0, &EnergyModel::default());

        assert_eq!(summary.estimated_power_watts, 21.67);
        assert_eq!(summary.estimated_energy_wh, 0.0421);
    }
}
