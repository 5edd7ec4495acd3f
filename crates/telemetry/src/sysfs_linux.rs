//! Linux procfs metric readers.

// ---------------------------------------------------------------------------
// Public metric readers
// ---------------------------------------------------------------------------

/// Reads CPU idle and total jiffies from `/proc/stat`.
pub fn read_cpu_times() -> (u64, u64) {
    match std::fs::read_to_string("/proc/stat") {
        Ok(content) => parse_cpu_times(&content),
        Err(_) => (0, 0),
    }
}

/// Reads memory info from `/proc/meminfo`.
/// Returns (total, available) in bytes, or (-1, -1) if unreadable.
pub fn read_mem_info() -> (i64, i64) {
    match std::fs::read_to_string("/proc/meminfo") {
        Ok(content) => parse_mem_info(&content),
        Err(_) => (-1, -1),
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn parse_cpu_times(content: &str) -> (u64, u64) {
    // First line: "cpu  user nice system idle iowait irq softirq steal ..."
    let line = match content.lines().next() {
        Some(l) if l.starts_with("cpu ") => l,
        _ => return (0, 0),
    };

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1) // skip "cpu"
        .filter_map(|f| f.parse().ok())
        .collect();

    if fields.len() < 4 {
        return (0, 0);
    }

    let idle = fields[3];
    let total: u64 = fields.iter().sum();
    (idle, total)
}

fn parse_mem_info(content: &str) -> (i64, i64) {
    let mut total: i64 = -1;
    let mut available: i64 = -1;

    for line in content.lines() {
        if let Some(val) = parse_meminfo_kb(line, "MemTotal:") {
            total = val * 1024;
        } else if let Some(val) = parse_meminfo_kb(line, "MemAvailable:") {
            available = val * 1024;
        }
    }

    (total, available)
}

/// Parses a line from `/proc/meminfo` matching a prefix, returns value in kB.
fn parse_meminfo_kb(line: &str, prefix: &str) -> Option<i64> {
    if !line.starts_with(prefix) {
        return None;
    }
    line[prefix.len()..]
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
}
