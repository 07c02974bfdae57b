//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source couldn't be read or parsed into the expected shape.
    #[display("could not load configuration")]
    Load,
    /// An explicitly requested configuration file has an extension we can't parse.
    #[display("unsupported configuration file: {}", _0.display())]
    UnsupportedFile(#[error(not(source))] PathBuf),
    /// The configuration parsed, but a value doesn't make sense.
    #[display("invalid configuration value for '{key}': {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        key: &'static str,
        /// What's wrong with it.
        reason: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Fix the file, then try again. Not the same thing.
        false
    }
}
