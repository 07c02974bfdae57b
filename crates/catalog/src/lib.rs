//! SQLite catalog of libraries, series and archive files.
//!
//! Unlike the files on disk, the catalog also holds state that can't be
//! rebuilt by rescanning: reading progress and the metadata fetched from
//! external providers. The scanner keeps the rest in sync with the disk.
//!
//! # Architecture
//! - **Libraries**: root directories, one per collection.
//! - **Series**: one per top-level folder of a library, unique by title
//!   within it, with optional provider metadata stored as JSON.
//! - **Files**: one per archive in a series folder, with its ordering numbers,
//!   page count and reading progress.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{File, FileChanges, Library, NewFile, NewSeries, Series};
pub use crate::repo::Repository;
