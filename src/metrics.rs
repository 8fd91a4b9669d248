// Swap metrics
//
// Lightweight counters for what the variant manager did during a run

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Run metrics
///
/// Atomic counters so a shell on another thread can read them without locks.
/// Logged once on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Number of times the target file was hashed and classified
    pub classifications: AtomicU64,

    /// Swaps that completed
    pub swaps_completed: AtomicU64,

    /// Swaps that returned an error
    pub swaps_failed: AtomicU64,

    /// Drift warnings raised (during swaps or against the last-used hint)
    pub drift_warnings: AtomicU64,

    /// Installs of the SteamVR build because the target was missing at startup
    pub bootstrap_installs: AtomicU64,

    /// Total time spent copying variant files, in milliseconds
    pub total_copy_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            classifications: AtomicU64::new(0),
            swaps_completed: AtomicU64::new(0),
            swaps_failed: AtomicU64::new(0),
            drift_warnings: AtomicU64::new(0),
            bootstrap_installs: AtomicU64::new(0),
            total_copy_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_classification(&self) {
        self.classifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swap_completed(&self) {
        self.swaps_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swap_failed(&self) {
        self.swaps_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drift(&self) {
        self.drift_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bootstrap(&self) {
        self.bootstrap_installs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy_time(&self, duration: Duration) {
        self.total_copy_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!(
            "Metrics: {} classifications, {} swaps ({} failed), {} drift warnings, {} bootstrap installs, {}ms copying, uptime {:.2}s",
            self.classifications.load(Ordering::Relaxed),
            self.swaps_completed.load(Ordering::Relaxed),
            self.swaps_failed.load(Ordering::Relaxed),
            self.drift_warnings.load(Ordering::Relaxed),
            self.bootstrap_installs.load(Ordering::Relaxed),
            self.total_copy_time_ms.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.classifications.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.swaps_completed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_counters() {
        let metrics = Metrics::new();

        metrics.record_classification();
        metrics.record_classification();
        metrics.record_swap_completed();
        metrics.record_swap_failed();
        metrics.record_drift();
        metrics.record_bootstrap();

        assert_eq!(metrics.classifications.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.swaps_completed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.swaps_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.drift_warnings.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.bootstrap_installs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_copy_time() {
        let metrics = Metrics::new();
        metrics.record_copy_time(Duration::from_millis(100));
        metrics.record_copy_time(Duration::from_millis(200));
        assert_eq!(metrics.total_copy_time_ms.load(Ordering::Relaxed), 300);
    }
}
