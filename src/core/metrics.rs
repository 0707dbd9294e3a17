//! Logger metrics for observability
//!
//! Counts what happened to emitted records: delivered to at least one sink,
//! filtered out by every threshold, or hit a sink write failure.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_log_pipeline::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_write_error();
/// metrics.record_logged();
///
/// assert_eq!(metrics.write_errors(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records delivered to at least one sink
    total_logged: AtomicU64,

    /// Records no core accepted
    filtered: AtomicU64,

    /// Individual sink writes that failed
    write_errors: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Record a delivered entry, returning the previous count
    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed writes as a percentage of write attempts (0.0 - 100.0)
    pub fn error_rate(&self) -> f64 {
        let errors = self.write_errors() as f64;
        let total = self.total_logged() as f64 + errors;
        if total == 0.0 {
            0.0
        } else {
            (errors / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.total_logged.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            total_logged: AtomicU64::new(self.total_logged()),
            filtered: AtomicU64::new(self.filtered()),
            write_errors: AtomicU64::new(self.write_errors()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.total_logged(), 0);
        assert_eq!(metrics.filtered(), 0);
        assert_eq!(metrics.write_errors(), 0);
    }

    #[test]
    fn test_metrics_record_returns_previous() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_write_error(), 0);
        assert_eq!(metrics.write_errors(), 1);
        metrics.record_filtered();
        metrics.record_filtered();
        assert_eq!(metrics.filtered(), 2);
    }

    #[test]
    fn test_metrics_error_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.error_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_logged();
        }
        for _ in 0..10 {
            metrics.record_write_error();
        }

        let rate = metrics.error_rate();
        assert!((9.9..=10.1).contains(&rate), "Error rate was {}", rate);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();

        let snapshot = metrics.clone();
        metrics.record_logged();
        metrics.reset();

        assert_eq!(snapshot.total_logged(), 1);
        assert_eq!(metrics.total_logged(), 0);
    }
}
