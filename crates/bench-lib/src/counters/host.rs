//! Portable counter collection through `sysinfo`

use super::{CounterSource, Snapshot};
use crate::models::Reading;
use async_trait::async_trait;
use std::time::Duration;
use sysinfo::{Disks, Networks, System};

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Counter source for hosts without procfs
pub struct SysinfoSource {
    system: System,
    networks: Networks,
    disks: Disks,
    cpu_window: Duration,
}

impl SysinfoSource {
    pub fn new(cpu_window: Duration) -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            // sysinfo needs this much time between two CPU refreshes
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    fn memory_readings(&mut self) -> (Reading<f64>, Reading<f64>, Reading<f64>) {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            let reason = "total memory reported as zero".to_string();
            return (
                Reading::Unavailable(reason.clone()),
                Reading::Unavailable(reason.clone()),
                Reading::Unavailable(reason),
            );
        }

        let used = self.system.used_memory();
        let available = self.system.available_memory();
        (
            Reading::Present(used as f64 / total as f64 * 100.0),
            Reading::Present(used as f64 / BYTES_PER_MB),
            Reading::Present(available as f64 / BYTES_PER_MB),
        )
    }

    fn network_readings(&mut self) -> (Reading<u64>, Reading<u64>) {
        self.networks.refresh(true);
        let (sent, received) = self
            .networks
            .list()
            .iter()
            .filter(|(name, _)| name.as_str() != "lo")
            .fold((0u64, 0u64), |(sent, received), (_, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    received.saturating_add(data.total_received()),
                )
            });
        (Reading::Present(sent), Reading::Present(received))
    }

    fn disk_readings(&mut self) -> (Reading<u64>, Reading<u64>) {
        self.disks.refresh(true);
        if self.disks.list().is_empty() {
            let reason = "no disks reported".to_string();
            return (Reading::Unavailable(reason.clone()), Reading::Unavailable(reason));
        }

        let (read, written) = self.disks.list().iter().fold((0u64, 0u64), |(r, w), disk| {
            let usage = disk.usage();
            (
                r.saturating_add(usage.total_read_bytes),
                w.saturating_add(usage.total_written_bytes),
            )
        });
        (Reading::Present(read), Reading::Present(written))
    }
}

#[async_trait]
impl CounterSource for SysinfoSource {
    async fn read_snapshot(&mut self) -> Snapshot {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(self.cpu_window).await;
        self.system.refresh_cpu_usage();
        let cpu_percent = Reading::Present(f64::from(self.system.global_cpu_usage()));

        let (memory_percent, memory_used_mb, memory_available_mb) = self.memory_readings();
        let (disk_read_bytes, disk_write_bytes) = self.disk_readings();
        let (net_sent_bytes, net_recv_bytes) = self.network_readings();

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
        "sysinfo"
    }

    fn cpu_window(&self) -> Duration {
        self.cpu_window
    }
}
