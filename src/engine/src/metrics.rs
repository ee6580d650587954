//! Rotation metrics
//!
//! Thread-safe counters shared by every entry task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Thread-safe metrics for tracking deletion, rotation and retention work
#[derive(Debug, Clone)]
pub struct RotationMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Ticks that ran to completion
    ticks_run: AtomicUsize,
    /// Ticks skipped because the entry was still running
    ticks_skipped: AtomicUsize,
    files_deleted: AtomicUsize,
    files_rotated: AtomicUsize,
    files_compressed: AtomicUsize,
    /// Rotated copies removed by retention
    files_pruned: AtomicUsize,
    /// Per-file failures of any kind
    failures: AtomicUsize,
    /// Bytes freed by deletion and pruning
    bytes_reclaimed: AtomicU64,
}

impl Default for RotationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub fn record_tick_run(&self) {
        self.inner.ticks_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_skipped(&self) {
        self.inner.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self, count: usize) {
        self.inner.files_deleted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_rotated(&self, count: usize) {
        self.inner.files_rotated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_compressed(&self, count: usize) {
        self.inner.files_compressed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_pruned(&self, count: usize) {
        self.inner.files_pruned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failures(&self, count: usize) {
        self.inner.failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_bytes_reclaimed(&self, bytes: u64) {
        self.inner
            .bytes_reclaimed
            .fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn ticks_run(&self) -> usize {
        self.inner.ticks_run.load(Ordering::Relaxed)
    }

    pub fn ticks_skipped(&self) -> usize {
        self.inner.ticks_skipped.load(Ordering::Relaxed)
    }

    pub fn files_deleted(&self) -> usize {
        self.inner.files_deleted.load(Ordering::Relaxed)
    }

    pub fn files_rotated(&self) -> usize {
        self.inner.files_rotated.load(Ordering::Relaxed)
    }

    pub fn files_compressed(&self) -> usize {
        self.inner.files_compressed.load(Ordering::Relaxed)
    }

    pub fn files_pruned(&self) -> usize {
        self.inner.files_pruned.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> usize {
        self.inner.failures.load(Ordering::Relaxed)
    }

    pub fn bytes_reclaimed(&self) -> u64 {
        self.inner.bytes_reclaimed.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            ticks_run: self.ticks_run(),
            ticks_skipped: self.ticks_skipped(),
            files_deleted: self.files_deleted(),
            files_rotated: self.files_rotated(),
            files_compressed: self.files_compressed(),
            files_pruned: self.files_pruned(),
            failures: self.failures(),
            bytes_reclaimed: self.bytes_reclaimed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSummary {
    pub ticks_run: usize,
    pub ticks_skipped: usize,
    pub files_deleted: usize,
    pub files_rotated: usize,
    pub files_compressed: usize,
    pub files_pruned: usize,
    pub failures: usize,
    pub bytes_reclaimed: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        tracing::info!(
            ticks_run = self.ticks_run,
            ticks_skipped = self.ticks_skipped,
            files_deleted = self.files_deleted,
            files_rotated = self.files_rotated,
            files_compressed = self.files_compressed,
            files_pruned = self.files_pruned,
            failures = self.failures,
            bytes_reclaimed = self.bytes_reclaimed,
            "Cumulative rotation metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = RotationMetrics::new();
        assert_eq!(metrics.ticks_run(), 0);
        assert_eq!(metrics.files_rotated(), 0);
        assert_eq!(metrics.bytes_reclaimed(), 0);
    }

    #[test]
    fn test_metrics_increment() {
        let metrics = RotationMetrics::new();

        metrics.record_tick_run();
        metrics.record_tick_skipped();
        metrics.record_deleted(2);
        metrics.record_rotated(3);
        metrics.record_compressed(3);
        metrics.record_pruned(1);
        metrics.record_failures(4);
        metrics.record_bytes_reclaimed(1024);

        let summary = metrics.summary();
        assert_eq!(summary.ticks_run, 1);
        assert_eq!(summary.ticks_skipped, 1);
        assert_eq!(summary.files_deleted, 2);
        assert_eq!(summary.files_rotated, 3);
        assert_eq!(summary.files_compressed, 3);
        assert_eq!(summary.files_pruned, 1);
        assert_eq!(summary.failures, 4);
        assert_eq!(summary.bytes_reclaimed, 1024);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = RotationMetrics::new();
        let clone = metrics.clone();

        clone.record_rotated(1);
        assert_eq!(metrics.files_rotated(), 1);
    }
}
