//! Errors shared by processors, exporters and the provider.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by pipeline components.
///
/// Export failures surfaced through this type never reach instrumented
/// application code; the owning span processor logs and swallows them. The
/// variants exist so that pipeline-level callers (`force_flush`, `shutdown`)
/// can tell a deadline expiry apart from a genuine failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdkError {
    /// Shutdown has already been invoked on this component.
    #[error("shutdown already invoked")]
    AlreadyShutdown,

    /// The operation did not complete before its deadline. In-flight work is
    /// abandoned, not retried.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Any other failure, e.g. a sink write error. The affected batch is
    /// dropped; buffer state stays intact.
    #[error("operation failed: {0}")]
    InternalFailure(String),
}

/// Result type for pipeline operations.
pub type SdkResult = Result<(), SdkError>;

impl<T> From<PoisonError<T>> for SdkError {
    fn from(err: PoisonError<T>) -> Self {
        SdkError::InternalFailure(err.to_string())
    }
}
