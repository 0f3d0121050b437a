//! Pipeline error types

use thiserror::Error;

use freight_protocol::BoxError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced by the pipeline driver
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Built without any source
    #[error("pipeline has no sources - at least one source is required")]
    NoSources,

    /// Built without any destination
    #[error("pipeline has no destinations - at least one destination is required")]
    NoDestinations,

    /// A leg (source, destination, or pump) failed fatally
    #[error("pipeline leg '{leg}' failed: {source}")]
    Leg {
        /// Which leg died
        leg: String,
        /// The underlying failure
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    pub(crate) fn leg(leg: impl Into<String>, source: BoxError) -> Self {
        Self::Leg {
            leg: leg.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_error_display() {
        let err = PipelineError::leg("source:journald", "connect refused".into());
        assert!(err.to_string().contains("source:journald"));
    }

    #[test]
    fn test_build_errors_display() {
        assert!(PipelineError::NoSources.to_string().contains("source"));
        assert!(PipelineError::NoDestinations
            .to_string()
            .contains("destination"));
    }
}
