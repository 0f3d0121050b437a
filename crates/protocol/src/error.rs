//! Protocol error types

use thiserror::Error;

/// Type-erased error used across adapter boundaries
///
/// Source, destination, flush, and policy implementations come from
/// outside the pipeline; their concrete error types are not knowable here.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Returned by a suspending call interrupted by cancellation
///
/// Distinct from every failure error so callers can tell "asked to stop"
/// apart from "broke".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Whether a boxed adapter error is the cancellation marker
pub fn is_cancelled(err: &BoxError) -> bool {
    err.downcast_ref::<Cancelled>().is_some()
}
