//! Command Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::process::ExitCode;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open the catalog")]
    Catalog,
    #[display("metadata lookup failed")]
    Metadata,
    #[display("{_0}")]
    Library(#[error(not(source))] String),
    #[display("no match for {_0:?}")]
    NoMatch(#[error(not(source))] String),
    #[display("could not write output")]
    Output,
    #[display("interrupted")]
    Interrupted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog | Self::Interrupted)
    }

    /// `EX_USAGE`/`EX_CONFIG` style codes, roughly.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config => ExitCode::from(78),
            Self::Interrupted => ExitCode::from(130),
            _ => ExitCode::FAILURE,
        }
    }
}
