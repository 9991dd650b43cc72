//! Error types and handling for pushflow
//!
//! Errors never unwind through a pipeline. Producers and combinators report
//! them through the completion half of a sink (`Sink::end`), so every
//! variant here is cheap to clone and compare.

use std::fmt;
use std::time::Duration;

use crate::framing::FramingError;

/// Main error type for stream operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// I/O related errors
    #[error("IO error: {0}")]
    IO(String),
    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
    /// Operation was cancelled before it reported an outcome
    #[error("Operation cancelled")]
    Cancelled,
    /// A pipeline was consumed while a previous consumption was still running
    #[error("Stream is already being consumed")]
    AlreadyConsuming,
    /// A single-pass source was consumed a second time
    #[error("Single-pass source has already been consumed")]
    SourceExhausted,
    /// An upstream operation reported a failure
    #[error("Operation failed: {0}")]
    Failed(String),
    /// A framed channel delivered something that is not a message
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),
    /// Custom error with message
    #[error("Stream error: {0}")]
    Custom(String),
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IO(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for StreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StreamError::Timeout
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Custom(err.to_string())
    }
}

impl<E: fmt::Display> From<RetryError<E>> for StreamError {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Timeout(_) => StreamError::Timeout,
            RetryError::Failed(inner) => StreamError::Failed(inner.to_string()),
            RetryError::Abandoned => StreamError::Cancelled,
        }
    }
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Outcome of an operation wrapped with a retry/timeout policy
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryError<E> {
    /// No attempt completed before the deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// The last attempt failed and the retry budget is spent
    #[error("Operation failed: {0}")]
    Failed(E),
    /// Every attempt handle was dropped without reporting
    #[error("Operation abandoned without completing")]
    Abandoned,
}

impl<E> RetryError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout(_))
    }

    /// The error reported by the final attempt, if any
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Failed(inner) => Some(inner),
            _ => None,
        }
    }
}
