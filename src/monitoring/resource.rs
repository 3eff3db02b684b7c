//! Resource Usage Snapshots
//!
//! Gathers process memory and host CPU/load figures that are attached
//! to every monitoring report. Every figure except memory is optional.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::debug;
use serde::Serialize;
use sysinfo::{get_current_pid, Pid, ProcessRefreshKind, System};

use super::cpu::{CpuProbe, HOST_CPU_PROBE};
use super::round_to;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A single resource usage snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Peak resident memory of this process, in MB
    pub memory_peak_mb: f64,
    /// Current resident memory of this process, in MB
    pub memory_current_mb: f64,
    /// 1-minute load average (absent on Windows)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_load: Option<f64>,
    /// CPU usage percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
}

/// Collects [`Metrics`] for the current process.
///
/// # Example
///
/// ```rust,no_run
/// use cronwatch::monitoring::MetricsCollector;
///
/// let collector = MetricsCollector::new();
/// let metrics = collector.collect();
/// println!("{} MB resident", metrics.memory_current_mb);
/// ```
pub struct MetricsCollector {
    system: Mutex<System>,
    process_id: Option<Pid>,
    cpu: CpuProbe,
    peak_bytes: AtomicU64,
}

impl MetricsCollector {
    /// Creates a collector using the strategies detected for this host.
    pub fn new() -> Self {
        let process_id = get_current_pid()
            .map_err(|e| debug!("Current process ID unavailable: {}", e))
            .ok();

        Self {
            system: Mutex::new(System::new()),
            process_id,
            cpu: HOST_CPU_PROBE.clone(),
            peak_bytes: AtomicU64::new(0),
        }
    }

    /// Replaces the CPU probe.
    pub fn with_cpu_probe(mut self, probe: CpuProbe) -> Self {
        self.cpu = probe;
        self
    }

    /// Takes a snapshot. Never fails; unavailable figures are omitted.
    ///
    /// May block for ~100ms when CPU usage falls back to kernel
    /// counter sampling.
    pub fn collect(&self) -> Metrics {
        let current = self.current_memory_bytes().unwrap_or(0);
        let reported_peak = read_peak_rss_bytes().unwrap_or(0);
        let peak = self
            .peak_bytes
            .fetch_max(current.max(reported_peak), Ordering::Relaxed)
            .max(current)
            .max(reported_peak);

        Metrics {
            memory_peak_mb: bytes_to_mb(peak),
            memory_current_mb: bytes_to_mb(current),
            system_load: system_load(),
            cpu_usage: self.cpu.sample().map(|usage| round_to(usage, 2)),
        }
    }

    /// Resident memory of this process as reported by sysinfo.
    fn current_memory_bytes(&self) -> Option<u64> {
        let pid = self.process_id?;
        let mut system = match self.system.lock() {
            Ok(system) => system,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !system.refresh_process_specifics(pid, ProcessRefreshKind::new().with_memory()) {
            debug!("Process {} not found while sampling memory", pid);
            return None;
        }

        system.process(pid).map(|process| process.memory())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn bytes_to_mb(bytes: u64) -> f64 {
    round_to(bytes as f64 / BYTES_PER_MB, 2)
}

/// 1-minute load average, where the OS provides one.
fn system_load() -> Option<f64> {
    if cfg!(windows) {
        return None;
    }

    let one = System::load_average().one;
    if one.is_finite() && one >= 0.0 {
        Some(one)
    } else {
        debug!("Ignoring invalid load average {}", one);
        None
    }
}

/// Peak resident set size (`VmHWM`) from `/proc/self/status`.
#[cfg(target_os = "linux")]
fn read_peak_rss_bytes() -> Option<u64> {
    match std::fs::read_to_string("/proc/self/status") {
        Ok(content) => parse_status_kb(&content, "VmHWM:"),
        Err(e) => {
            debug!("Peak memory unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn read_peak_rss_bytes() -> Option<u64> {
    None
}

/// Reads a `Key:   1234 kB` entry from a proc status file as bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_status_kb(content: &str, key: &str) -> Option<u64> {
    let line = content.lines().find(|line| line.starts_with(key))?;
    let kb = line[key.len()..]
        .split_whitespace()
        .next()?
        .parse::<u64>()
        .ok()?;
    Some(kb * 1024)
}
