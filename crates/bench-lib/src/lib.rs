//! Resource benchmarking library
//!
//! This crate provides the core functionality for:
//! - Reading host counters from procfs or sysinfo
//! - Periodic sampling with cumulative disk and network deltas
//! - Run summaries with a TDP-based energy estimate
//! - JSON, HTML and Prometheus text artifacts
//! - Cross-environment comparison and a CPU workload generator

pub mod compare;
pub mod counters;
pub mod error;
pub mod models;
pub mod observability;
pub mod report;
pub mod sampler;
pub mod summary;
pub mod workload;

pub use compare::{load_reports, Comparison, EnvironmentResult, LoadedReport};
pub use counters::{create_source, CounterSource, Snapshot};
pub use error::{BenchError, Result};
pub use models::*;
pub use observability::{SamplerMetrics, StructuredLogger};
pub use sampler::{Sampler, SamplerBuilder, SamplerConfig};
pub use summary::{summarize, EnergyModel};
pub use workload::{Intensity, WorkloadBenchmark, WorkloadResult};
