//! Batcher configuration

use std::time::Duration;

use crate::error::{BatchError, Result};

/// Default maximum messages per batch
pub const DEFAULT_FLUSH_LENGTH: usize = 1;

/// Default maximum concurrent flushes
pub const DEFAULT_FLUSH_PARALLELISM: usize = 1;

/// Default grace period for shutdown before declaring deadlock
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Batcher`](crate::Batcher)
///
/// All fields have working defaults; construction of the batcher
/// validates them and fails fast on nonsense values.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum messages per batch; a full batch flushes immediately.
    /// Minimum 1. Default: 1.
    pub flush_length: usize,

    /// Maximum time a non-empty batch may buffer before flushing.
    /// `None` disables the timer - batches flush on length alone.
    /// Default: None.
    pub flush_frequency: Option<Duration>,

    /// Maximum flush operations in flight at once. Dispatch beyond this
    /// cap blocks, backpressuring `send` callers. Minimum 1. Default: 1.
    pub flush_parallelism: usize,

    /// Grace period after cancellation before shutdown is declared
    /// deadlocked. Default: 5s.
    pub stop_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_length: DEFAULT_FLUSH_LENGTH,
            flush_frequency: None,
            flush_parallelism: DEFAULT_FLUSH_PARALLELISM,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl BatchConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum messages per batch
    #[must_use]
    pub fn with_flush_length(mut self, length: usize) -> Self {
        self.flush_length = length;
        self
    }

    /// Set the maximum buffering latency for a non-empty batch
    #[must_use]
    pub fn with_flush_frequency(mut self, frequency: Option<Duration>) -> Self {
        self.flush_frequency = frequency;
        self
    }

    /// Set the maximum concurrent flushes
    #[must_use]
    pub fn with_flush_parallelism(mut self, parallelism: usize) -> Self {
        self.flush_parallelism = parallelism;
        self
    }

    /// Set the shutdown grace period
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.flush_length == 0 {
            return Err(BatchError::config(
                "flush_length",
                "must be at least 1 message per batch",
            ));
        }
        if self.flush_parallelism == 0 {
            return Err(BatchError::config(
                "flush_parallelism",
                "must allow at least 1 flush in flight",
            ));
        }
        if self.stop_timeout.is_zero() {
            return Err(BatchError::config(
                "stop_timeout",
                "must be a non-zero grace period",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::new();
        assert_eq!(config.flush_length, 1);
        assert_eq!(config.flush_frequency, None);
        assert_eq!(config.flush_parallelism, 1);
        assert_eq!(config.stop_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = BatchConfig::new()
            .with_flush_length(128)
            .with_flush_frequency(Some(Duration::from_millis(250)))
            .with_flush_parallelism(4)
            .with_stop_timeout(Duration::from_secs(1));
        assert_eq!(config.flush_length, 128);
        assert_eq!(config.flush_frequency, Some(Duration::from_millis(250)));
        assert_eq!(config.flush_parallelism, 4);
        assert_eq!(config.stop_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_zero_length() {
        let config = BatchConfig::new().with_flush_length(0);
        assert!(matches!(
            config.validate(),
            Err(BatchError::Config { field: "flush_length", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let config = BatchConfig::new().with_flush_parallelism(0);
        assert!(matches!(
            config.validate(),
            Err(BatchError::Config { field: "flush_parallelism", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_stop_timeout() {
        let config = BatchConfig::new().with_stop_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(BatchError::Config { field: "stop_timeout", .. })
        ));
    }
}
