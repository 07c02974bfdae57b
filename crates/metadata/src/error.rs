//! Metadata Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A metadata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Lookups themselves are best-effort and report "nothing found" rather than
/// an error; these are for bad input and for downloads.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something that can never succeed.
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
    /// The HTTP client couldn't be built.
    #[display("could not initialize HTTP client")]
    Client,
    /// Connection, timeout or body read failure.
    #[display("request failed: {_0}")]
    Request(#[error(not(source))] String),
    /// The server answered, but not with a success.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// Queued behind the rate limiter and never sent.
    #[display("request was cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Cancelled => true,
            Self::Status(status) => *status == 429 || *status >= 500,
            Self::InvalidArgument(_) | Self::Client => false,
        }
    }
}
