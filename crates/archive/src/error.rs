//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every kind here is an extraction failure as far as the scanner is
//! concerned: the archive still gets cataloged, just without pages or a
//! preview.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The container is corrupt, truncated, encrypted, or not what its
    /// extension claims. Don't retry with the same file.
    #[display("invalid or corrupted archive")]
    InvalidArchive,
    /// The file extension isn't an archive format we know about.
    #[display("unsupported archive format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The first page isn't an image we can decode.
    #[display("could not decode page image: {_0}")]
    Decode(#[error(not(source))] String),
    /// Producing the JPEG preview failed.
    #[display("could not encode preview image")]
    Encode,
    /// Reading the archive or writing the preview hit the filesystem and lost.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::InvalidArchive.is_retryable());
        assert!(!ErrorKind::Decode("p1.avif".to_string()).is_retryable());
    }
}
