//! CPU Usage Probing
//!
//! CPU usage is read through one of several host-specific strategies.
//! The usable strategies are detected once per process and then tried
//! in priority order until one produces a value.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;

use super::round_to;

/// Kernel file exposing cumulative CPU time counters.
const PROC_STAT_PATH: &str = "/proc/stat";

/// Pause between the two `/proc/stat` samples.
const KERNEL_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Strategies detected for this host, computed on first use.
pub static HOST_CPU_PROBE: Lazy<CpuProbe> = Lazy::new(CpuProbe::detect);

/// A way of obtaining a CPU usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuStrategy {
    /// `ps` query for the current process's %CPU column
    ProcessTable,
    /// `wmic` query for the system load percentage
    SystemUtility,
    /// Two `/proc/stat` samples 100ms apart, system-wide
    KernelCounters,
}

impl CpuStrategy {
    /// Attempts to read CPU usage with this strategy.
    fn read(self) -> Result<f64, Box<dyn Error>> {
        match self {
            CpuStrategy::ProcessTable => read_process_table(),
            CpuStrategy::SystemUtility => read_system_utility(),
            CpuStrategy::KernelCounters => read_kernel_counters(),
        }
    }
}

/// Ordered set of CPU strategies available on a host.
#[derive(Debug, Clone, Default)]
pub struct CpuProbe {
    strategies: Vec<CpuStrategy>,
}

impl CpuProbe {
    /// Creates a probe with an explicit strategy order.
    pub fn new(strategies: Vec<CpuStrategy>) -> Self {
        Self { strategies }
    }

    /// Inspects the host and selects the strategies it supports.
    pub fn detect() -> Self {
        let mut strategies = Vec::new();

        if cfg!(windows) {
            if tool_available("wmic") {
                strategies.push(CpuStrategy::SystemUtility);
            }
        } else {
            if tool_available("ps") {
                strategies.push(CpuStrategy::ProcessTable);
            }
            if Path::new(PROC_STAT_PATH).exists() {
                strategies.push(CpuStrategy::KernelCounters);
            }
        }

        debug!("CPU usage strategies: {:?}", strategies);
        Self { strategies }
    }

    /// Returns the strategies in the order they are tried.
    pub fn strategies(&self) -> &[CpuStrategy] {
        &self.strategies
    }

    /// Returns CPU usage from the first strategy that succeeds.
    ///
    /// Failures are logged at debug level and never propagated.
    pub fn sample(&self) -> Option<f64> {
        for strategy in &self.strategies {
            match strategy.read() {
                Ok(value) if value.is_finite() && value >= 0.0 => return Some(value),
                Ok(value) => debug!("{:?} returned unusable CPU value {}", strategy, value),
                Err(e) => debug!("CPU usage via {:?} unavailable: {}", strategy, e),
            }
        }
        None
    }
}

/// Checks whether a command-line tool can be found on PATH.
fn tool_available(tool: &str) -> bool {
    let locator = if cfg!(windows) { "where" } else { "which" };

    Command::new(locator)
        .arg(tool)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn read_process_table() -> Result<f64, Box<dyn Error>> {
    let pid = std::process::id().to_string();
    let output = Command::new("ps").args(["-p", pid.as_str(), "-o", "%cpu"]).output()?;

    if !output.status.success() {
        return Err(format!("ps exited with {:?}", output.status.code()).into());
    }

    parse_ps_output(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| "unparsable ps output".into())
}

fn read_system_utility() -> Result<f64, Box<dyn Error>> {
    let output = Command::new("wmic")
        .args(["cpu", "get", "loadpercentage", "/value"])
        .output()?;

    if !output.status.success() {
        return Err(format!("wmic exited with {:?}", output.status.code()).into());
    }

    parse_wmic_output(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| "no LoadPercentage in wmic output".into())
}

fn read_kernel_counters() -> Result<f64, Box<dyn Error>> {
    let first = parse_proc_stat(&fs::read_to_string(PROC_STAT_PATH)?)
        .ok_or("unparsable /proc/stat")?;
    thread::sleep(KERNEL_SAMPLE_INTERVAL);
    let second = parse_proc_stat(&fs::read_to_string(PROC_STAT_PATH)?)
        .ok_or("unparsable /proc/stat")?;

    usage_between(first, second).ok_or_else(|| "no CPU time elapsed between samples".into())
}

/// Extracts the value from `ps -o %cpu` output (header line optional).
fn parse_ps_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()?
        .parse::<f64>()
        .ok()
}

/// Extracts `LoadPercentage=N` from `wmic ... /value` output.
fn parse_wmic_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("LoadPercentage="))
        .and_then(|value| value.trim().parse::<f64>().ok())
}

/// Cumulative CPU time counters, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Uses user, nice, system, idle, iowait, irq, softirq and steal.
/// Idle time includes iowait.
fn parse_proc_stat(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|line| line.starts_with("cpu "))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|field| field.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;

    if fields.len() < 4 {
        return None;
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        idle,
        total: fields.iter().sum(),
    })
}

/// Computes system-wide usage between two samples.
///
/// Returns `None` when no time elapsed, instead of dividing by zero.
fn usage_between(first: CpuTimes, second: CpuTimes) -> Option<f64> {
    let delta_total = second.total.saturating_sub(first.total);
    if delta_total == 0 {
        return None;
    }

    let delta_idle = second.idle.saturating_sub(first.idle).min(delta_total);
    let usage = 100.0 * (1.0 - delta_idle as f64 / delta_total as f64);
    Some(round_to(usage, 2))
}
