//! Errors raised by traceable string operations.

use thiserror::Error;

/// Result type for traceable string operations.
pub type TraceResult<T> = Result<T, TraceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// Slice bounds outside the content or reversed.
    #[error("invalid slice [{begin}:{end}] of string with length {len}")]
    Range { begin: usize, end: usize, len: usize },
    /// Index lookup past the end of the content.
    #[error("index {index} out of bounds for length {len}")]
    Index { index: usize, len: usize },
    /// Line lookup past the last line.
    #[error("line {line} out of bounds ({lines} lines)")]
    Line { line: usize, lines: usize },
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// Persisted data does not describe a traceable string.
    #[error("malformed traceable string data: {0}")]
    Format(String),
}

impl From<serde_json::Error> for TraceError {
    fn from(err: serde_json::Error) -> Self {
        TraceError::Format(err.to_string())
    }
}
