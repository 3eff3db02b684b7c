//! Resource Monitoring Module
//!
//! Provides best-effort host and process metrics for monitoring reports.
//!
//! # Components
//!
//! - [`MetricsCollector`]: Memory, load and CPU snapshot
//! - [`CpuProbe`]: Host-specific CPU usage strategies

pub mod cpu;
pub mod resource;

pub use cpu::{CpuProbe, CpuStrategy, HOST_CPU_PROBE};
pub use resource::{Metrics, MetricsCollector};

/// Rounds `value` to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
