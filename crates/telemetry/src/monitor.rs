use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::platform;

/// One reading of host utilisation. Negative values mean "unavailable".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemLoad {
    pub cpu_percent: f64,
    pub ram_percent: f64,
}

impl SystemLoad {
    pub const UNAVAILABLE: SystemLoad = SystemLoad {
        cpu_percent: -1.0,
        ram_percent: -1.0,
    };
}

impl fmt::Display for SystemLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU: ")?;
        write_percent(f, self.cpu_percent)?;
        write!(f, " | RAM: ")?;
        write_percent(f, self.ram_percent)
    }
}

fn write_percent(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value < 0.0 {
        write!(f, "n/a")
    } else {
        write!(f, "{value:.1}%")
    }
}

/// Samples CPU and memory utilisation.
///
/// CPU usage is derived from the jiffies delta between two consecutive
/// calls to [`sample`](Self::sample), so the first reading covers the time
/// since the monitor was created.
pub struct LoadMonitor {
    prev_cpu: Mutex<(u64, u64)>,
}

impl Default for LoadMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadMonitor {
    pub fn new() -> Self {
        Self {
            prev_cpu: Mutex::new(platform::read_cpu_times()),
        }
    }

    /// Takes a new reading.
    pub fn sample(&self) -> SystemLoad {
        let (idle, total) = platform::read_cpu_times();
        let cpu_percent = {
            let mut prev = self.prev_cpu.lock().unwrap_or_else(PoisonError::into_inner);
            let usage = cpu_usage(*prev, (idle, total));
            *prev = (idle, total);
            usage
        };

        let (mem_total, mem_available) = platform::read_mem_info();
        let ram_percent = memory_usage(mem_total, mem_available);

        trace!(cpu_percent, ram_percent, "sampled host load");
        SystemLoad {
            cpu_percent,
            ram_percent,
        }
    }
}

fn cpu_usage(prev: (u64, u64), now: (u64, u64)) -> f64 {
    let (prev_idle, prev_total) = prev;
    let (idle, total) = now;
    if total == 0 {
        return -1.0;
    }
    let total_delta = total.saturating_sub(prev_total);
    if total_delta == 0 {
        return 0.0;
    }
    let idle_delta = idle.saturating_sub(prev_idle).min(total_delta);
    (total_delta - idle_delta) as f64 / total_delta as f64 * 100.0
}

fn memory_usage(total: i64, available: i64) -> f64 {
    if total <= 0 || available < 0 {
        return -1.0;
    }
    (total - available.min(total)) as f64 / total as f64 * 100.0
}
