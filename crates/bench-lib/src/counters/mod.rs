//! Host counter snapshots
//!
//! This module provides readers for the instantaneous system counters a
//! sampling run is built from: CPU load, memory, and the cumulative disk and
//! network byte counters. Linux hosts are read straight from procfs; any
//! other host falls back to the `sysinfo` crate.
//!
//! Every field of a [`Snapshot`] is a [`Reading`], so a sandbox that hides
//! one counter (no `/proc/diskstats`, for example) degrades that field only.

mod host;
mod procfs;


pub use host::SysinfoSource;
pub use procfs::{CpuTimes, MemoryInfo, ProcfsSource};

use crate::models::Reading;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Default CPU measurement window
pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_millis(100);

/// Instantaneous counter values taken at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub cpu_percent: Reading<f64>,
    pub memory_percent: Reading<f64>,
    pub memory_used_mb: Reading<f64>,
    pub memory_available_mb: Reading<f64>,
    pub disk_read_bytes: Reading<u64>,
    pub disk_write_bytes: Reading<u64>,
    pub net_sent_bytes: Reading<u64>,
    pub net_recv_bytes: Reading<u64>,
}

impl Snapshot {
    /// Names and reasons of every field that could not be read
    #[cfg(test)]
    pub(crate) fn unavailable_fields(&self) -> Vec<(&'static str, &str)> {
        let fields: [(&'static str, Option<&str>); 8] = [
            ("cpu_percent", self.cpu_percent.reason()),
            ("memory_percent", self.memory_percent.reason()),
            ("memory_used_mb", self.memory_used_mb.reason()),
            ("memory_available_mb", self.memory_available_mb.reason()),
            ("disk_read_bytes", self.disk_read_bytes.reason()),
            ("disk_write_bytes", self.disk_write_bytes.reason()),
            ("net_sent_bytes", self.net_sent_bytes.reason()),
            ("net_recv_bytes", self.net_recv_bytes.reason()),
        ];

        fields
            .into_iter()
            .filter_map(|(name, reason)| reason.map(|r| (name, r)))
            .collect()
    }
}

/// Trait for counter snapshot implementations
#[async_trait]
pub trait CounterSource: Send {
    /// Take one snapshot. Waits for the CPU measurement window; never fails
    /// as a whole, unreadable counters come back as `Reading::Unavailable`.
    async fn read_snapshot(&mut self) -> Snapshot;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// How long each `read_snapshot` waits to measure CPU load
    fn cpu_window(&self) -> Duration;
}

/// Create the appropriate counter source for this host
pub async fn create_source(proc_root: &Path, cpu_window: Duration) -> Box<dyn CounterSource> {
    let source = ProcfsSource::new(proc_root).with_cpu_window(cpu_window);

    if source.is_available().await {
        tracing::info!(proc_root = %proc_root.display(), "Using procfs counter source");
        Box::new(source)
    } else {
        tracing::info!("procfs not available, using sysinfo counter source");
        Box::new(SysinfoSource::new(cpu_window))
    }
}
