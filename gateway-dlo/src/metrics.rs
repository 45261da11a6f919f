use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DloMetrics {
    total_captured: AtomicU64,
    total_retried: AtomicU64,
    total_purged: AtomicU64,
    total_degraded_captures: AtomicU64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DloMetricsSnapshot {
    pub total_captured: u64,
    pub total_retried: u64,
    pub total_purged: u64,
    pub current_count: u64,
}

impl DloMetrics {
    pub(crate) fn record_capture(&self, degraded: bool) {
        self.total_captured.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.total_degraded_captures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_retry(&self) {
        self.total_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_purge(&self, count: u64) {
        self.total_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self, current_count: u64) -> DloMetricsSnapshot {
        DloMetricsSnapshot {
            total_captured: self.total_captured.load(Ordering::Relaxed),
            total_retried: self.total_retried.load(Ordering::Relaxed),
            total_purged: self.total_purged.load(Ordering::Relaxed),
            current_count,
        }
    }
}
