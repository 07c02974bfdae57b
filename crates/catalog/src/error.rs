//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("library not found: {_0}")]
    LibraryNotFound(#[error(not(source))] i64),
    #[display("series not found: {_0}")]
    SeriesNotFound(#[error(not(source))] i64),
    #[display("file not found: {_0}")]
    FileNotFound(#[error(not(source))] i64),
    /// A uniqueness constraint was violated (same library root, same series
    /// title in a library, same file path in a series).
    #[display("already exists: {_0}")]
    Conflict(#[error(not(source))] String),
    /// A reading position past the end of the file.
    #[display("page {page} is beyond the last page ({total_pages})")]
    PageOutOfRange {
        /// The requested page.
        page: u32,
        /// The file's page count.
        total_pages: u32,
    },
    /// Serialization/deserialization error.
    #[display("invalid catalog data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // SQLITE_BUSY shows up as a generic database error; everything else
        // is going to fail the same way next time.
        matches!(self, ErrorKind::Database)
    }

    /// Whether the error means "the thing you asked for doesn't exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::LibraryNotFound(_) | Self::SeriesNotFound(_) | Self::FileNotFound(_))
    }
}
