//! Periodic metrics sampling
//!
//! A run reads a baseline snapshot, then one snapshot per tick. Disk and
//! network counters are reported as deltas against the baseline.

mod delta;
mod r#loop;

pub use delta::{DeltaTracker, Deltas};
pub use r#loop::{next_tick_delay, Sampler, SamplerBuilder, SamplerConfig, SamplerState};
