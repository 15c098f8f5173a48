use thiserror::Error;

/// Failures this layer classifies itself.
///
/// Driver and I/O errors pass through as plain [`crate::Error`] values; the
/// variants here cover conditions detected before or between round trips.
/// None of them is retried.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Rejected synchronously, before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The statement does not have a recognizable top-level SELECT shape.
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    /// The construct is named so the caller can see what to remove.
    #[error("unsupported query shape: {0}")]
    UnsupportedQueryShape(String),
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),
    /// A logic or schema bug, not a caller error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
