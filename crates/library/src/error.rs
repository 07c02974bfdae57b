//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No library with that ID.
    #[display("library {_0} not found")]
    NotFound(#[error(not(source))] i64),
    /// A scan for that library is already running. Poll its status instead.
    #[display("a scan of library {_0} is already in progress")]
    AlreadyInProgress(#[error(not(source))] i64),
    /// The request can't be satisfied as given.
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
    #[display("catalog operation failed")]
    Catalog,
    #[display("library folder could not be accessed")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyInProgress(_) | Self::Catalog | Self::Storage)
    }

    /// The HTTP status a server layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::AlreadyInProgress(_) => 409,
            Self::InvalidArgument(_) => 400,
            Self::Catalog | Self::Storage => 500,
        }
    }
}
