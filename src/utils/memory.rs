/// Resident memory of this process in megabytes, 0 when the platform can't tell
pub fn resident_memory_mb() -> u64 {
    memory_stats::memory_stats()
        .map(|stats| (stats.physical_mem as f64 / 1024.0 / 1024.0).round() as u64)
        .unwrap_or(0)
}
