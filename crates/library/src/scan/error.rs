//! Errors that end the reconciliation of a single series.
//!
//! They never end the scan; the loop records the message against the series
//! and moves on.

use derive_more::{Display, Error};
use tankobon_catalog::error::Error as CatalogError;
use tankobon_metadata::error::Error as MetadataError;
use tankobon_storage::error::Error as StorageError;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("catalog: {_0}")]
    Catalog(#[error(not(source))] String),
    #[display("storage: {_0}")]
    Storage(#[error(not(source))] String),
    #[display("cover: {_0}")]
    Cover(#[error(not(source))] String),
}

// Keep the inner message in the kind itself: it's what ends up in the scan
// status, and readers there don't get the error tree.
impl ErrorKind {
    #[track_caller]
    pub fn catalog(err: CatalogError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Catalog(message))
    }

    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Storage(message))
    }

    #[track_caller]
    pub fn cover(err: MetadataError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Cover(message))
    }
}
