//! Batcher metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the flush workers
#[derive(Debug, Default)]
pub struct BatcherMetrics {
    /// Batches flushed successfully
    pub batches_flushed: AtomicU64,

    /// Messages flushed successfully (sum of batch lengths)
    pub messages_flushed: AtomicU64,

    /// Flush attempts that returned an error
    pub flush_errors: AtomicU64,
}

impl BatcherMetrics {
    /// Create a zeroed metrics instance
    pub const fn new() -> Self {
        Self {
            batches_flushed: AtomicU64::new(0),
            messages_flushed: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
        }
    }

    /// Record a successful flush of `message_count` messages
    #[inline]
    pub fn flush_ok(&self, message_count: u64) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.messages_flushed
            .fetch_add(message_count, Ordering::Relaxed);
    }

    /// Record a failed flush attempt
    #[inline]
    pub fn flush_err(&self) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            messages_flushed: self.messages_flushed.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BatcherMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Batches flushed successfully
    pub batches_flushed: u64,
    /// Messages flushed successfully
    pub messages_flushed: u64,
    /// Flush attempts that returned an error
    pub flush_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = BatcherMetrics::new();
        metrics.flush_ok(10);
        metrics.flush_ok(5);
        metrics.flush_err();

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_flushed, 2);
        assert_eq!(snap.messages_flushed, 15);
        assert_eq!(snap.flush_errors, 1);
    }
}
