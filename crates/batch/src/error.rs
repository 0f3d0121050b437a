//! Batcher error types

use thiserror::Error;

use freight_protocol::BoxError;

/// Result type for batcher operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors produced by the batching core
#[derive(Debug, Error)]
pub enum BatchError {
    /// Configuration rejected at construction
    #[error("invalid batch config: {field} {message}")]
    Config {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: &'static str,
    },

    /// The send was cancelled before every message was accepted
    #[error("send cancelled before all messages were accepted")]
    Cancelled,

    /// The batcher's run loop has terminated; no more messages are accepted
    #[error("batcher is no longer running")]
    Closed,

    /// `run` was invoked a second time on the same instance
    #[error("run may only be invoked once per batcher")]
    AlreadyRunning,

    /// Shutdown did not complete within the configured grace period
    ///
    /// One or more flushes or their downstream acknowledgments never
    /// completed. Distinct from [`Cancelled`](BatchError::Cancelled) so
    /// callers can tell a clean stop from a stuck pipeline.
    #[error("shutdown deadlocked: pending flushes did not resolve within the stop timeout")]
    Deadlock,

    /// A flush failure the error policy decided is fatal
    #[error("{0}")]
    Flush(#[from] BoxError),
}

impl BatchError {
    pub(crate) fn config(field: &'static str, message: &'static str) -> Self {
        Self::Config { field, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_error_display_is_transparent() {
        let inner: BoxError = "flush error".into();
        let err = BatchError::from(inner);
        assert_eq!(err.to_string(), "flush error");
    }

    #[test]
    fn test_deadlock_is_distinct_from_cancelled() {
        assert_ne!(
            BatchError::Deadlock.to_string(),
            BatchError::Cancelled.to_string()
        );
        assert!(matches!(BatchError::Deadlock, BatchError::Deadlock));
    }

    #[test]
    fn test_config_error_names_field() {
        let err = BatchError::config("flush_length", "must be at least 1 message per batch");
        assert!(err.to_string().contains("flush_length"));
    }
}
