//! Cumulative counter deltas since the start of a run

use crate::counters::Snapshot;
use crate::models::Reading;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Delta state for one cumulative byte counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CounterDelta {
    baseline: Option<u64>,
    last: u64,
    /// Usage accumulated before the most recent counter reset
    carried: u64,
}

impl CounterDelta {
    /// Returns (bytes since baseline, whether a reset was detected)
    fn update(&mut self, current: u64) -> (u64, bool) {
        let Some(baseline) = self.baseline else {
            self.baseline = Some(current);
            self.last = current;
            return (0, false);
        };

        let mut reset = false;
        if current < self.last {
            // Counter went backwards: keep what was accrued and re-base
            self.carried = self.carried.saturating_add(self.last.saturating_sub(baseline));
            self.baseline = Some(current);
            reset = true;
        }
        self.last = current;

        let baseline = self.baseline.unwrap_or(current);
        (self.carried.saturating_add(current.saturating_sub(baseline)), reset)
    }

    fn apply(&mut self, reading: &Reading<u64>) -> (Reading<f64>, bool) {
        match reading {
            Reading::Present(current) => {
                let (bytes, reset) = self.update(*current);
                (Reading::Present(bytes as f64 / BYTES_PER_MB), reset)
            }
            Reading::Unavailable(reason) => (Reading::Unavailable(reason.clone()), false),
        }
    }
}

/// Per-sample deltas, in megabytes since the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct Deltas {
    pub disk_read_mb: Reading<f64>,
    pub disk_write_mb: Reading<f64>,
    pub net_sent_mb: Reading<f64>,
    pub net_recv_mb: Reading<f64>,
    /// Counters that went backwards since the previous snapshot
    pub resets: Vec<&'static str>,
}

/// Tracks the disk and network baselines of a run
///
/// The baseline of each counter is its first successful reading; a counter
/// unavailable at run start is baselined the first time it can be read.
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    disk_read: CounterDelta,
    disk_write: CounterDelta,
    net_sent: CounterDelta,
    net_recv: CounterDelta,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker with its baseline taken from `snapshot`
    pub fn from_baseline(snapshot: &Snapshot) -> Self {
        let mut tracker = Self::new();
        tracker.delta(snapshot);
        tracker
    }

    /// Whether every counter has a baseline
    pub fn is_baselined(&self) -> bool {
        [self.disk_read, self.disk_write, self.net_sent, self.net_recv]
            .iter()
            .all(|c| c.baseline.is_some())
    }

    /// Compute cumulative deltas for a later snapshot
    pub fn delta(&mut self, snapshot: &Snapshot) -> Deltas {
        let mut resets = Vec::new();

        let (disk_read_mb, reset) = self.disk_read.apply(&snapshot.disk_read_bytes);
        if reset {
            resets.push("disk_read_mb");
        }
        let (disk_write_mb, reset) = self.disk_write.apply(&snapshot.disk_write_bytes);
        if reset {
            resets.push("disk_write_mb");
        }
        let (net_sent_mb, reset) = self.net_sent.apply(&snapshot.net_sent_bytes);
        if reset {
            resets.push("net_sent_mb");
        }
        let (net_recv_mb, reset) = self.net_recv.apply(&snapshot.net_recv_bytes);
        if reset {
            resets.push("net_recv_mb");
        }

        Deltas {
            disk_read_mb,
            disk_write_mb,
            net_sent_mb,
            net_recv_mb,
            resets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(disk_read: u64, disk_write: u64, sent: u64, recv: u64) -> Snapshot {
        Snapshot {
            cpu_percent: Reading::Present(0.0),
            memory_percent: Reading::Present(0.0),
            memory_used_mb: Reading::Present(0.0),
            memory_available_mb: Reading::Present(0.0),
            disk_read_bytes: Reading::Present(disk_read),
            disk_write_bytes: Reading::Present(disk_write),
            net_sent_bytes: Reading::Present(sent),
            net_recv_bytes: Reading::Present(recv),
        }
    }

    #[test]
    fn test_delta_in_megabytes() {
        let mut tracker = DeltaTracker::from_baseline(&snapshot(1000, 0, 500, 0));

        let deltas = tracker.delta(&snapshot(2_001_000, 4_000_000, 500, 1_500_000));

        assert!((deltas.disk_read_mb.value_or_zero() - 2.0).abs() < 1e-9);
        assert!((deltas.disk_write_mb.value_or_zero() - 4.0).abs() < 1e-9);
        assert_eq!(deltas.net_sent_mb.value(), Some(0.0));
        assert!((deltas.net_recv_mb.value_or_zero() - 1.5).abs() < 1e-9);
        assert!(deltas.resets.is_empty());
    }

    #[test]
    fn test_baseline_is_zero_delta() {
        let mut tracker = DeltaTracker::new();
        let deltas = tracker.delta(&snapshot(123, 456, 789, 1011));

        assert_eq!(deltas.disk_read_mb.value(), Some(0.0));
        assert_eq!(deltas.net_recv_mb.value(), Some(0.0));
        assert!(tracker.is_baselined());
    }

    #[test]
    fn test_counter_reset_never_goes_negative() {
        let mut tracker = DeltaTracker::from_baseline(&snapshot(1_000_000, 0, 0, 0));

        let deltas = tracker.delta(&snapshot(3_000_000, 0, 0, 0));
        assert!((deltas.disk_read_mb.value_or_zero() - 2.0).abs() < 1e-9);

        // Counter restarted from a small value
        let deltas = tracker.delta(&snapshot(500_000, 0, 0, 0));
        assert_eq!(deltas.resets, vec!["disk_read_mb"]);
        assert!((deltas.disk_read_mb.value_or_zero() - 2.0).abs() < 1e-9);

        let deltas = tracker.delta(&snapshot(1_500_000, 0, 0, 0));
        assert!((deltas.disk_read_mb.value_or_zero() - 3.0).abs() < 1e-9);
        assert!(deltas.resets.is_empty());
    }

    #[test]
    fn test_unavailable_counter_baselined_late() {
        let mut first = snapshot(0, 0, 0, 0);
        first.net_sent_bytes = Reading::Unavailable("no net/dev".to_string());
        let mut tracker = DeltaTracker::from_baseline(&first);
        assert!(!tracker.is_baselined());

        let mut second = snapshot(0, 0, 0, 0);
        second.net_sent_bytes = Reading::Unavailable("no net/dev".to_string());
        let deltas = tracker.delta(&second);
        assert_eq!(deltas.net_sent_mb.reason(), Some("no net/dev"));

        // First successful read becomes the baseline
        let deltas = tracker.delta(&snapshot(0, 0, 7_000_000, 0));
        assert_eq!(deltas.net_sent_mb.value(), Some(0.0));

        let deltas = tracker.delta(&snapshot(0, 0, 8_000_000, 0));
        assert!((deltas.net_sent_mb.value_or_zero() - 1.0).abs() < 1e-9);
    }
}
