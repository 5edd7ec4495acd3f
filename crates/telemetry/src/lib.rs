//! Host load indicators for the relaydrop progress display.
//!
//! Reads CPU and memory utilisation from platform-specific sources. Only
//! Linux procfs is implemented; other platforms report the values as
//! unavailable.

mod monitor;

#[cfg(target_os = "linux")]
#[path = "sysfs_linux.rs"]
mod platform;

#[cfg(not(target_os = "linux"))]
#[path = "sysfs_other.rs"]
mod platform;

pub use monitor::{LoadMonitor, SystemLoad};
