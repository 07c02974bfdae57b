//! Async Utility Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An async utility error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for async utility operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The scheduled work never produced an output: it panicked, or the
    /// runtime driving the limiter shut down before reaching it.
    #[display("scheduled work was cancelled before it completed")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
