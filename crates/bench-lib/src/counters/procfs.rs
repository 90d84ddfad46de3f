//! procfs counter collection
//!
//! Reads host-wide counters from the Linux proc filesystem:
//! - stat for aggregate CPU time
//! - meminfo for total and available memory
//! - diskstats for sectors read and written by whole disks
//! - net/dev for bytes sent and received on non-loopback interfaces

use super::{CounterSource, Snapshot, DEFAULT_CPU_WINDOW};
use crate::error::{BenchError, Result};
use crate::models::Reading;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// diskstats always counts 512-byte sectors, regardless of the device
const SECTOR_SIZE: u64 = 512;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Aggregate CPU time from the `cpu` line of /proc/stat, in clock ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub idle: u64,
}

impl CpuTimes {
    /// Busy percentage between two readings
    pub fn busy_percent_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(earlier.total);
        let idle = self.idle.saturating_sub(earlier.idle);

        if total == 0 {
            return 0.0;
        }

        (total.saturating_sub(idle) as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Memory figures from /proc/meminfo, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Counter source for the Linux proc filesystem
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    proc_root: PathBuf,
    cpu_window: Duration,
}

impl ProcfsSource {
    /// Create a new procfs source rooted at `proc_root` (normally `/proc`)
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            cpu_window: DEFAULT_CPU_WINDOW,
        }
    }

    /// Set the CPU measurement window
    pub fn with_cpu_window(mut self, cpu_window: Duration) -> Self {
        self.cpu_window = cpu_window;
        self
    }

    /// Check if the proc filesystem is mounted at the configured root
    pub async fn is_available(&self) -> bool {
        fs::metadata(self.proc_root.join("stat")).await.is_ok()
    }

    /// Parse /proc/stat contents
    pub fn parse_cpu_stat(content: &str) -> Result<CpuTimes> {
        let line = content
            .lines()
            .find(|l| l.starts_with("cpu "))
            .ok_or_else(|| BenchError::counter_unavailable("cpu", "no aggregate cpu line"))?;

        // user nice system idle iowait irq softirq steal; guest time is already in user
        let values: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .filter_map(|v| v.parse().ok())
            .collect();

        if values.len() < 4 {
            return Err(BenchError::counter_unavailable(
                "cpu",
                format!("expected at least 4 cpu time columns, found {}", values.len()),
            ));
        }

        let idle = values[3] + values.get(4).copied().unwrap_or(0);
        Ok(CpuTimes {
            total: values.iter().sum(),
            idle,
        })
    }

    /// Parse /proc/meminfo contents
    pub fn parse_meminfo(content: &str) -> Result<MemoryInfo> {
        let mut fields = HashMap::new();

        for line in content.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(value) = parts[1].parse::<u64>() {
                    fields.insert(parts[0].trim_end_matches(':'), value * 1024);
                }
            }
        }

        let total_bytes = *fields
            .get("MemTotal")
            .ok_or_else(|| BenchError::counter_unavailable("memory", "MemTotal missing"))?;

        // Kernels before 3.14 have no MemAvailable
        let available_bytes = match fields.get("MemAvailable") {
            Some(v) => *v,
            None => ["MemFree", "Buffers", "Cached"]
                .iter()
                .filter_map(|k| fields.get(k))
                .sum(),
        };

        Ok(MemoryInfo {
            total_bytes,
            available_bytes,
        })
    }

    /// Parse /proc/diskstats contents
    /// Returns (read_bytes, written_bytes) summed over whole disks
    pub fn parse_diskstats(content: &str) -> Result<(u64, u64)> {
        let mut read_bytes = 0u64;
        let mut written_bytes = 0u64;
        let mut disks = 0usize;

        for line in content.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 10 || !is_whole_disk(parts[2]) {
                continue;
            }

            let sectors_read: u64 = parts[5].parse().unwrap_or(0);
            let sectors_written: u64 = parts[9].parse().unwrap_or(0);
            read_bytes = read_bytes.saturating_add(sectors_read * SECTOR_SIZE);
            written_bytes = written_bytes.saturating_add(sectors_written * SECTOR_SIZE);
            disks += 1;
        }

        if disks == 0 {
            return Err(BenchError::counter_unavailable(
                "disk",
                "no whole-disk devices in diskstats",
            ));
        }

        Ok((read_bytes, written_bytes))
    }

    /// Parse /proc/net/dev contents
    /// Returns (sent_bytes, received_bytes) summed over non-loopback interfaces
    pub fn parse_net_dev(content: &str) -> Result<(u64, u64)> {
        let mut sent = 0u64;
        let mut received = 0u64;

        for line in content.lines().skip(2) {
            let Some((iface, stats)) = line.split_once(':') else {
                continue;
            };
            if iface.trim() == "lo" {
                continue;
            }

            let fields: Vec<u64> = stats
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
            if fields.len() < 16 {
                continue;
            }

            received = received.saturating_add(fields[0]);
            sent = sent.saturating_add(fields[8]);
        }

        Ok((sent, received))
    }

    async fn read_proc_file(&self, counter: &'static str, name: &str) -> Result<String> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path)
            .await
            .map_err(|e| BenchError::counter_unavailable(counter, format!("{}: {}", path.display(), e)))
    }

    async fn read_cpu_times(&self) -> Result<CpuTimes> {
        let content = self.read_proc_file("cpu", "stat").await?;
        Self::parse_cpu_stat(&content)
    }

    async fn read_cpu_percent(&self) -> Result<f64> {
        let before = self.read_cpu_times().await?;
        tokio::time::sleep(self.cpu_window).await;
        let after = self.read_cpu_times().await?;
        Ok(after.busy_percent_since(&before))
    }

    async fn read_memory(&self) -> Result<MemoryInfo> {
        let content = self.read_proc_file("memory", "meminfo").await?;
        Self::parse_meminfo(&content)
    }

    async fn read_disk(&self) -> Result<(u64, u64)> {
        let content = self.read_proc_file("disk", "diskstats").await?;
        Self::parse_diskstats(&content)
    }

    async fn read_network(&self) -> Result<(u64, u64)> {
        let content = self.read_proc_file("network", "net/dev").await?;
        Self::parse_net_dev(&content)
    }
}

/// Whole disks only; partitions would double count their parent device
fn is_whole_disk(name: &str) -> bool {
    const VIRTUAL_PREFIXES: &[&str] = &["loop", "ram", "zram", "fd", "sr", "dm-", "md"];
    if VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return false;
    }

    // nvme0n1 / mmcblk0 vs nvme0n1p1 / mmcblk0p1
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        return match name.rsplit_once('p') {
            Some((device, part)) => {
                !(device.ends_with(|c: char| c.is_ascii_digit())
                    && !part.is_empty()
                    && part.chars().all(|c| c.is_ascii_digit()))
            }
            None => true,
        };
    }

    // sda / vda / xvda / hda vs sda1
    ["sd", "vd", "xvd", "hd"].iter().any(|p| name.starts_with(p))
        && !name.ends_with(|c: char| c.is_ascii_digit())
}

fn split_reading(result: Result<(u64, u64)>) -> (Reading<u64>, Reading<u64>) {
    match result {
        Ok((a, b)) => (Reading::Present(a), Reading::Present(b)),
        Err(e) => {
            let reason = e.to_string();
            (Reading::Unavailable(reason.clone()), Reading::Unavailable(reason))
        }
    }
}

#[async_trait]
impl CounterSource for ProcfsSource {
    async fn read_snapshot(&mut self) -> Snapshot {
        let cpu_percent = self.read_cpu_percent().await.into();

        let memory: Reading<MemoryInfo> = self.read_memory().await.into();
        let memory_percent = memory.clone().map(|m| m.used_percent());
        let memory_used_mb = memory.clone().map(|m| m.used_bytes() as f64 / BYTES_PER_MB);
        let memory_available_mb = memory.map(|m| m.available_bytes as f64 / BYTES_PER_MB);

        let (disk_read_bytes, disk_write_bytes) = split_reading(self.read_disk().await);
        let (net_sent_bytes, net_recv_bytes) = split_reading(self.read_network().await);

        Snapshot {
            cpu_percent,
            memory_percent,
            memory_used_mb,
            memory_available_mb,
            disk_read_bytes,
            disk_write_bytes,
            net_sent_bytes,
            net_recv_bytes,
        }
    }

    fn name(&self) -> &'static str {
        "procfs"
    }

    fn cpu_window(&self) -> Duration {
        self.cpu_window
    }
}
