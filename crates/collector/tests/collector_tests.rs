//! Collector integration tests
//!
//! Each run points the collector at a mock proc tree so results do not
//! depend on the machine running the tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const STAT: &str = "cpu  100 0 100 800 0 0 0 0 0 0\n";
const MEMINFO: &str = "MemTotal: 4000000 kB\nMemFree: 500000 kB\nMemAvailable: 3000000 kB\n";
const DISKSTATS: &str = "   8       0 sda 10 0 4000 5 20 0 8000 10 0 15 15\n";
const NET_DEV: &str = "Inter-| Receive | Transmit\n face |bytes packets|bytes packets\n  eth0: 2000000 10 0 0 0 0 0 0 1000000 5 0 0 0 0 0 0\n";

fn mock_proc(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("proc");
    std::fs::create_dir_all(root.join("net")).unwrap();
    std::fs::write(root.join("stat"), STAT).unwrap();
    std::fs::write(root.join("meminfo"), MEMINFO).unwrap();
    std::fs::write(root.join("diskstats"), DISKSTATS).unwrap();
    std::fs::write(root.join("net").join("dev"), NET_DEV).unwrap();
    root
}

fn run_collector(proc_root: &Path, interval: &str, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bench-collector"))
        .arg("--proc-root")
        .arg(proc_root)
        .args(["--duration", "1", "--interval", interval, "--cpu-window-ms", "10"])
        .args(extra)
        .env_remove("COLLECTOR_CONFIG")
        .output()
        .expect("Failed to execute bench-collector")
}

#[test]
fn test_collector_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_bench-collector"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--environment"));
    assert!(stdout.contains("--html-output"));
    assert!(stdout.contains("--self-metrics"));
}

#[test]
fn test_collector_writes_all_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let proc_root = mock_proc(&temp_dir);
    let json = temp_dir.path().join("out").join("docker.json");
    let html = temp_dir.path().join("out").join("docker.html");
    let prom = temp_dir.path().join("out").join("docker.prom");

    let output = run_collector(
        &proc_root,
        "0.5",
        &[
            "--environment",
            "docker",
            "--output",
            json.to_str().unwrap(),
            "--html-output",
            html.to_str().unwrap(),
            "--exposition-output",
            prom.to_str().unwrap(),
        ],
    );

    assert!(
        output.status.success(),
        "collector failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("docker"));
    assert!(stdout.contains("Samples"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["environment"], "docker");
    assert!(report["samples"].as_array().unwrap().len() >= 2);
    assert_eq!(report["summary"]["estimation_method"], "tdp_scaled_cpu");
    // Static mock counters never move
    assert_eq!(report["summary"]["total_disk_read_mb"], 0.0);

    assert!(std::fs::read_to_string(&html).unwrap().contains("<!DOCTYPE html>"));
    assert!(std::fs::read_to_string(&prom)
        .unwrap()
        .contains("bench_cpu_usage_percent{environment=\"docker\"}"));
}

#[test]
fn test_collector_rejects_zero_interval() {
    let temp_dir = TempDir::new().unwrap();
    let proc_root = mock_proc(&temp_dir);
    let json = temp_dir.path().join("never.json");

    let output = run_collector(&proc_root, "0", &["--output", json.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(!json.exists());
}

#[test]
fn test_collector_rejects_cpu_window_longer_than_interval() {
    let temp_dir = TempDir::new().unwrap();
    let proc_root = mock_proc(&temp_dir);
    let json = temp_dir.path().join("never.json");

    let output = Command::new(env!("CARGO_BIN_EXE_bench-collector"))
        .arg("--proc-root")
        .arg(&proc_root)
        .args(["--duration", "1", "--interval", "0.5", "--cpu-window-ms", "600"])
        .arg("--output")
        .arg(&json)
        .env_remove("COLLECTOR_CONFIG")
        .output()
        .expect("Failed to execute bench-collector");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cpu_window"));
    assert!(!json.exists());
}

#[test]
fn test_collector_reads_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let proc_root = mock_proc(&temp_dir);
    let json = temp_dir.path().join("from-config.json");
    let config = temp_dir.path().join("collector.toml");
    std::fs::write(
        &config,
        format!(
            "environment = \"microvm\"\ntdp_watts = 15.0\noutput = \"{}\"\n",
            json.display()
        ),
    )
    .unwrap();

    let output = run_collector(&proc_root, "0.5", &["--config", config.to_str().unwrap()]);
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["environment"], "microvm");
    assert_eq!(report["summary"]["assumed_tdp_watts"], 15.0);
}
