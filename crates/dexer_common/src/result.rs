//! Result type for failures that indicate a bug rather than bad input.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an internal error (a bug in dexer), not a user-facing
/// error. User errors are reported as diagnostics attributed to the offending
/// module property.
pub type DexerResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in dexer, not a configuration problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
