use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Allow/deny counters for the dashboard. Increments are atomic and the
/// snapshot read is lock-free; counts are monotonic for the process
/// lifetime.
pub struct StatsCollector {
    allow: AtomicU64,
    deny: AtomicU64,
    started_at: Instant,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            allow: AtomicU64::new(0),
            deny: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn increment_allow(&self) {
        self.allow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deny(&self) {
        self.deny.fetch_add(1, Ordering::Relaxed);
    }

    /// (allow, deny, uptime in whole seconds)
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.allow.load(Ordering::Relaxed),
            self.deny.load(Ordering::Relaxed),
            self.started_at.elapsed().as_secs(),
        )
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
